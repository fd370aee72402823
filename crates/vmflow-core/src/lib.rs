//! vmflow コアライブラリ
//!
//! プロビジョニング調整のコア（アドミッションゲート、VM IDアロケータ、
//! プロバイダーセッション）と、VM定義のモデル・KDLパーサー・ローダーを
//! 提供します。リモートAPIとのやり取り自体は vmflow-vm6 側の責務です。

pub mod allocator;
pub mod error;
pub mod gate;
pub mod loader;
pub mod model;
pub mod parser;
pub mod session;

pub use allocator::{UNDISCOVERED, VmIdAllocator, VmIdSource};
pub use error::{ProvisionError, Result};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use loader::{find_vms_file, find_vms_file_from, load_vms, load_vms_from};
pub use model::{VmDefaults, VmSet, VmSpec};
pub use parser::{parse_vms_document, parse_vms_file};
pub use session::{ProviderSession, SessionConfig};
