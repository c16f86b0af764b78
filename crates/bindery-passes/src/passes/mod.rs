//! The generation passes, in pipeline order:
//! - `trim`: drops private, anonymous, templated and filtered declarations
//! - `resolve_types`: drops declarations using types the bindings can't express
//! - `flag_enums`: finds bitmask enums via their marker specializations
//! - `interfaces`: turns secondary bases into interfaces
//! - `properties`: pairs accessors into properties
//! - `constants`: namespace constants and idiomatic renames
//! - `enums`: enum values, flag attributes and flag-set aliases
//! - `refcounted`: annotates the reference-counted hierarchy
//! - `events`: typed wrappers for event descriptors

mod constants;
mod enums;
mod events;
mod flag_enums;
mod interfaces;
mod properties;
mod refcounted;
mod resolve_types;
mod trim;

pub use constants::{constant_name, member_name, normalize_literal, ConstantsPass};
pub use enums::EnumsPass;
pub use events::EventsPass;
pub use flag_enums::FlagEnumsPass;
pub use interfaces::InterfacesPass;
pub use properties::PropertiesPass;
pub use refcounted::RefCountedPass;
pub use resolve_types::ResolveTypesPass;
pub use trim::TrimPass;

use crate::framework::Pass;

/// Create the standard pass sequence. Later passes rely on the facts and
/// removals of earlier ones, so the order is fixed.
pub fn default_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(TrimPass::new()),
        Box::new(ResolveTypesPass::new()),
        Box::new(FlagEnumsPass::new()),
        Box::new(InterfacesPass::new()),
        Box::new(PropertiesPass::new()),
        Box::new(ConstantsPass::new()),
        Box::new(EnumsPass::new()),
        Box::new(RefCountedPass::new()),
        Box::new(EventsPass::new()),
    ]
}
