// ─── NebulaCore ───
// Headless provisioning core for a Minecraft launcher.
//
// Architecture:
//   util/         — Streaming hashes + archive extraction
//   net/          — Varint codec, packet framing, server-list ping
//   rest/         — Response envelope + Mojang/Microsoft/Discord adapters
//   maven         — Maven coordinate parsing and repo path layout
//   distribution/ — Distribution document model, typed overlay, fetch/cache
//   java/         — JVM discovery, settings probe, ranking, JDK acquisition
//   download/     — Concurrent, resumable, hash-verified download engine
//   repair/       — Index processors + full-repair orchestrator
//   worker/       — Parent↔child process transport for repairs
//   paths         — Default launcher directory layout

pub mod distribution;
pub mod download;
pub mod error;
pub mod http;
pub mod java;
pub mod maven;
pub mod net;
pub mod paths;
pub mod repair;
pub mod rest;
pub mod util;
pub mod worker;

pub use error::{CoreError, CoreResult};
