//! # imgtool
//!
//! Declarative image edits. A request names a stored image and what to do
//! with it (resize, reformat, rotate, hit a target file size) and gets back
//! one encoded buffer plus the content type to serve it with.
//!
//! # Architecture: Request → Pipeline → Response
//!
//! ```text
//! 1. Parse     JSON body   →  EditRequest       (validated, typed)
//! 2. Fetch     fileId      →  source bytes      (ByteSource)
//! 3. Edit      bytes       →  EditOutcome       (decode → resize → format
//!                                                → size search → rotate → encode)
//! 4. Respond   outcome     →  EditResponse      (bytes, or a 400 JSON envelope)
//! ```
//!
//! Every stage is a function from an input value to a new value. The
//! pipeline never mutates an image in place, which is what lets the size
//! search re-encode the same snapshot on every trial.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | JSON body parsing and validation into [`request::EditRequest`] |
//! | [`storage`] | [`storage::ByteSource`] seam and the uploads-directory implementation |
//! | [`pipeline`] | Stage orchestration, [`pipeline::EditError`] codes |
//! | [`handler`] | [`handler::handle_request`], the single transport-facing entry point |
//! | [`response`] | Success bytes or the `{success, error, data}` failure envelope |
//! | [`imaging`] | Units, dimension math, codecs, the size-target search |
//! | [`config`] | `imgtool.toml` loading, validation, and merging |
//! | [`logging`] | Injected error sink ([`logging::ErrorLog`]) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Size Search Before Rotation
//!
//! The quality search runs on the unrotated image, then rotation is applied and
//! the image re-encoded at the chosen quality. Right-angle rotations barely
//! change encoded size, so the chosen quality still lands close to the target,
//! and the returned bytes always match the reported content type.
//!
//! ## Unreachable Targets Are Not Errors
//!
//! When even the lowest quality overshoots, the smallest buffer produced is
//! returned and the outcome is marked `target_met = false`. A client asking
//! for 5 KB from a 40 MP photo gets the best effort rather than nothing.
//!
//! ## Pure-Rust Codecs Where Possible
//!
//! JPEG, PNG and AVIF go through the `image` crate (AVIF via rav1e). WebP uses
//! libwebp through the `webp` crate because `image` only writes lossless WebP,
//! which has no quality to search over.

pub mod config;
pub mod handler;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod storage;
