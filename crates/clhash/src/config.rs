//! Runtime configuration (overrides + limits).
//!
//! This module centralizes the knobs for the keyed hasher:
//! - optional forced engine selection
//! - an optional per-worker key memory budget
//!
//! Forced modes are always clamped to detected CPU capabilities.
//!
//! # Environment
//!
//! | Variable            | Values                                   |
//! |---------------------|------------------------------------------|
//! | `CLHASH_FORCE`      | `auto`, `portable`, `vectorized`         |
//! | `CLHASH_KEY_BUDGET` | bytes a single worker's key buffer may use |

use platform::Caps;

use crate::engine::Engine;

/// Forced engine selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EngineForce {
  /// Use the fastest engine the CPU supports.
  #[default]
  Auto,
  /// Force the portable engine.
  Portable,
  /// Force the vectorized engine (if available).
  Vectorized,
}

impl EngineForce {
  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Auto => "auto",
      Self::Portable => "portable",
      Self::Vectorized => "vectorized",
    }
  }
}

/// Full runtime configuration (after applying overrides).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClhashConfig {
  /// Requested force mode (env/programmatic).
  pub requested_force: EngineForce,
  /// Force mode clamped to detected CPU capabilities.
  pub effective_force: EngineForce,
  /// Maximum bytes a worker's key buffer may occupy; `None` is unlimited.
  pub key_budget: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Overrides {
  force: EngineForce,
  key_budget: Option<usize>,
}

#[cfg(feature = "std")]
fn read_env_overrides() -> Overrides {
  fn parse_usize(name: &str) -> Option<usize> {
    let value = std::env::var(name).ok()?;
    let value = value.trim();
    if value.is_empty() {
      return None;
    }
    value.parse::<usize>().ok()
  }

  fn parse_force(name: &str) -> Option<EngineForce> {
    let value = std::env::var(name).ok()?;
    parse_force_value(&value)
  }

  Overrides {
    force: parse_force("CLHASH_FORCE").unwrap_or(EngineForce::Auto),
    key_budget: parse_usize("CLHASH_KEY_BUDGET"),
  }
}

fn parse_force_value(value: &str) -> Option<EngineForce> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }

  if value.eq_ignore_ascii_case("auto") {
    return Some(EngineForce::Auto);
  }
  if value.eq_ignore_ascii_case("portable") || value.eq_ignore_ascii_case("scalar") {
    return Some(EngineForce::Portable);
  }
  if value.eq_ignore_ascii_case("vectorized")
    || value.eq_ignore_ascii_case("simd")
    || value.eq_ignore_ascii_case("avx")
  {
    return Some(EngineForce::Vectorized);
  }

  None
}

#[cfg(feature = "std")]
fn overrides() -> Overrides {
  use std::sync::OnceLock;
  static OVERRIDES: OnceLock<Overrides> = OnceLock::new();
  *OVERRIDES.get_or_init(read_env_overrides)
}

#[cfg(not(feature = "std"))]
fn overrides() -> Overrides {
  Overrides::default()
}

#[inline]
#[must_use]
fn clamp_force_to_caps(requested: EngineForce, caps: Caps) -> EngineForce {
  match requested {
    EngineForce::Auto | EngineForce::Portable => requested,
    EngineForce::Vectorized => {
      if Engine::Vectorized.is_available_with(caps) {
        EngineForce::Vectorized
      } else {
        EngineForce::Auto
      }
    }
  }
}

#[must_use]
fn config_from(ov: Overrides, caps: Caps) -> ClhashConfig {
  ClhashConfig {
    requested_force: ov.force,
    effective_force: clamp_force_to_caps(ov.force, caps),
    key_budget: ov.key_budget,
  }
}

/// The active configuration. Environment variables are read once.
#[must_use]
pub fn get() -> ClhashConfig {
  config_from(overrides(), platform::caps())
}
