//! Publisher-specific repair policies.

mod cipc;
mod cmfclci;
mod eba;
mod edinet;

pub use cipc::CipcFixer;
pub use cmfclci::CmfclciFixer;
pub use eba::EbaFixer;
pub use edinet::EdinetFixer;

use crate::pipeline::PackageFixer;
use crate::provider::Provider;

/// Select the repair policy for a provider.
pub fn for_provider(provider: Provider) -> Box<dyn PackageFixer> {
    match provider {
        Provider::Eba => Box::new(EbaFixer),
        Provider::Edinet => Box::new(EdinetFixer),
        Provider::Cmfclci => Box::new(CmfclciFixer),
        Provider::Cipc => Box::new(CipcFixer),
    }
}
