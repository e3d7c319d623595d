//! # simcache-core: Identifier Derivation and Path Codec
//!
//! The pure half of simcache. Nothing in this crate touches the filesystem;
//! the storage engine in `simcache-store` and the HTTP layer in
//! `simcache-api` build on these types.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All input digests flow through
//!    `CanonicalBytes::new()` (RFC 8785 over a coerced value tree), so two
//!    logically equal inputs always digest identically.
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that no digest is computed over non-canonical bytes.
//!
//! 3. **Validated `Identifier`.** Tool name and revision are checked to be
//!    single safe path segments; the digest is always derived.
//!
//! 4. **Reversible codec.** `escape_file_name`/`unescape_file_name` and
//!    `FileHandle` are total, deterministic, and stateless.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `simcache-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod codec;
pub mod digest;
pub mod error;
pub mod identifier;
pub mod inputs;

pub use canonical::CanonicalBytes;
pub use codec::{escape_file_name, unescape_file_name, validate_file_name, FileHandle};
pub use digest::{sha256_digest, InputDigest};
pub use error::{CanonicalizationError, CodecError, ErrorKind, IdentifierError, InputsError};
pub use identifier::Identifier;
pub use inputs::parse_inputs_document;
