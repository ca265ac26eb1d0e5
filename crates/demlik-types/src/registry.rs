//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation (identity gateway, order store) registers
//! itself under the name used in configuration together with a factory
//! function.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct implementing
/// this trait, so the service can wire implementations from configuration
/// by name, for example:
/// - "memory" for store.implementations.memory
/// - "http" for identity.implementations.http
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	///
	/// Each crate defines its own factory alias, for example IdentityFactory
	/// for identity gateways or StoreFactory for order stores.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
