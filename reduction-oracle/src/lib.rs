//! Shortest-vector and reduced-profile queries over lattice bases.
//!
//! [`ReductionOracle`] hides which backend does the work:
//!
//! - [`SimulatedBackend`]: in-process approximation, always labeled as such
//! - [`ProcessBackend`]: the engine executable, driven through scratch files
//! - [`NativeBackend`]: the engine's C library (requires the `fplll` feature)
//!
//! The backend is picked at run time from an [`OracleConfig`], so one build can
//! compare all three on the same bases.

pub mod codec;
pub mod error;
pub mod native;
pub mod oracle;
pub mod process;
pub mod protocol;
pub mod simulated;

pub use codec::{decode_basis, decode_vector, encode_basis, write_basis, CodecError};
pub use error::{ErrorKind, OracleError};
pub use native::{EngineLibrary, EnumStatus, NativeBackend, NativeConfig};
pub use oracle::{
    BackendKind, FoundVector, Labeled, OracleConfig, Profile, QueryPhase, ReductionBackend, ReductionOracle,
    RelativeError, SvpOutcome,
};
pub use process::{EngineMode, ProcessBackend, ProcessConfig};
pub use protocol::{parse_profile_lines, parse_reduced_basis, parse_svp_output, SvpOutput, PROTOCOL_VERSION};
pub use simulated::{SimulatedBackend, SimulatedConfig};
