use crate::error::OpError;
use crate::registry::OpRegistry;

pub mod index_add;

/// Registers every built-in op type.
pub fn register_all(registry: &mut OpRegistry) -> Result<(), OpError> {
    index_add::register(registry)?;
    Ok(())
}
