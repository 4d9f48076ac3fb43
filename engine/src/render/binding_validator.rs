//! Shader Binding Validator
//!
//! Validates that every kernel's bind group layout matches the bindings its
//! WGSL declares. Catches mismatches between Rust-side layouts and shader
//! declarations at world construction, before they turn into GPU validation
//! errors mid-frame.
//!
//! The tables here are the canonical source of truth for the kernel
//! interfaces; the integration tests also check them against the composed
//! WGSL modules.

use std::fmt;

use crate::orchestrator::FrameStage;

/// Describes a single expected binding in a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedBinding {
    pub binding: u32,
    pub binding_type: ExpectedBindingType,
    pub label: &'static str,
}

/// The type of a binding, matching the wgpu::BindingType variants we use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedBindingType {
    UniformBuffer,
    StorageBufferReadOnly,
    StorageBufferReadWrite,
    Other,
}

impl fmt::Display for ExpectedBindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniformBuffer => write!(f, "uniform buffer"),
            Self::StorageBufferReadOnly => write!(f, "storage buffer (read-only)"),
            Self::StorageBufferReadWrite => write!(f, "storage buffer (read-write)"),
            Self::Other => write!(f, "non-buffer binding"),
        }
    }
}

const fn uniform(binding: u32, label: &'static str) -> ExpectedBinding {
    ExpectedBinding {
        binding,
        binding_type: ExpectedBindingType::UniformBuffer,
        label,
    }
}

const fn read_only(binding: u32, label: &'static str) -> ExpectedBinding {
    ExpectedBinding {
        binding,
        binding_type: ExpectedBindingType::StorageBufferReadOnly,
        label,
    }
}

const fn read_write(binding: u32, label: &'static str) -> ExpectedBinding {
    ExpectedBinding {
        binding,
        binding_type: ExpectedBindingType::StorageBufferReadWrite,
        label,
    }
}

const PAINT: &[ExpectedBinding] = &[read_write(0, "voxels"), uniform(1, "PaintRequests")];
const SAND_SETUP: &[ExpectedBinding] = &[read_write(0, "SandUniforms")];
const SAND_STEP: &[ExpectedBinding] = &[read_write(0, "voxels"), read_write(1, "SandUniforms")];
const EXPLOSION_STEP: &[ExpectedBinding] = &[
    uniform(0, "FrameUniforms"),
    read_write(1, "explosions"),
    read_write(2, "explosion meshes"),
    read_write(3, "explosion workgroups"),
];
const EXPLOSION_MESH: &[ExpectedBinding] = &[
    read_only(0, "explosion meshes"),
    read_write(1, "debris list"),
];
const PROJECTILE_STEP: &[ExpectedBinding] = &[
    uniform(0, "FrameUniforms"),
    read_write(1, "projectiles"),
    read_write(2, "SpawnMailbox"),
    read_write(3, "explosions"),
    read_write(4, "trail list"),
];
const PROJECTILE_COLLIDE: &[ExpectedBinding] =
    &[read_write(0, "voxels"), read_write(1, "projectiles")];
const MESHER: &[ExpectedBinding] = &[read_write(0, "voxels"), read_write(1, "face list")];

/// Group 0 bindings each kernel declares.
pub fn expected_bindings(stage: FrameStage) -> &'static [ExpectedBinding] {
    match stage {
        FrameStage::Paint => PAINT,
        FrameStage::SandSetup => SAND_SETUP,
        FrameStage::SandStep => SAND_STEP,
        FrameStage::ExplosionStep => EXPLOSION_STEP,
        FrameStage::ExplosionMesh => EXPLOSION_MESH,
        FrameStage::ProjectileStep => PROJECTILE_STEP,
        FrameStage::ProjectileCollide => PROJECTILE_COLLIDE,
        FrameStage::Mesher => MESHER,
    }
}

/// Classifies a wgpu::BindGroupLayoutEntry into our ExpectedBindingType.
pub fn classify_entry(entry: &wgpu::BindGroupLayoutEntry) -> ExpectedBindingType {
    match &entry.ty {
        wgpu::BindingType::Buffer { ty, .. } => match ty {
            wgpu::BufferBindingType::Uniform => ExpectedBindingType::UniformBuffer,
            wgpu::BufferBindingType::Storage { read_only: true } => {
                ExpectedBindingType::StorageBufferReadOnly
            }
            wgpu::BufferBindingType::Storage { read_only: false } => {
                ExpectedBindingType::StorageBufferReadWrite
            }
        },
        _ => ExpectedBindingType::Other,
    }
}

/// Validates actual bind group layout entries against a kernel's expected bindings.
/// Returns the number of mismatches found.
pub fn validate_bind_group(stage: FrameStage, actual_entries: &[wgpu::BindGroupLayoutEntry]) -> u32 {
    let expected = expected_bindings(stage);
    let mut mismatches = 0u32;

    for exp in expected {
        match actual_entries.iter().find(|e| e.binding == exp.binding) {
            None => {
                log::warn!(
                    "[BindingValidator] MISMATCH in '{}' binding {}: expected {} ({}), actual: MISSING",
                    stage.name(),
                    exp.binding,
                    exp.binding_type,
                    exp.label
                );
                mismatches += 1;
            }
            Some(actual) => {
                let actual_type = classify_entry(actual);
                if actual_type != exp.binding_type {
                    log::warn!(
                        "[BindingValidator] MISMATCH in '{}' binding {}: expected {} ({}), actual: {}",
                        stage.name(),
                        exp.binding,
                        exp.binding_type,
                        exp.label,
                        actual_type
                    );
                    mismatches += 1;
                }
            }
        }
    }

    for actual in actual_entries {
        if !expected.iter().any(|e| e.binding == actual.binding) {
            log::warn!(
                "[BindingValidator] EXTRA binding in '{}' binding {}: type {} not in shader expectations",
                stage.name(),
                actual.binding,
                classify_entry(actual)
            );
            mismatches += 1;
        }
    }

    mismatches
}

/// Validate every kernel layout. Logs results and returns total mismatches.
pub fn validate_compute_bindings(layouts: &[(FrameStage, &[wgpu::BindGroupLayoutEntry])]) -> u32 {
    let total: u32 = layouts
        .iter()
        .map(|(stage, entries)| validate_bind_group(*stage, entries))
        .sum();

    if total == 0 {
        log::info!(
            "[BindingValidator] All kernel bindings validated OK ({} bind groups)",
            layouts.len()
        );
    } else {
        log::warn!(
            "[BindingValidator] {} binding mismatch(es) found! GPU validation errors may occur.",
            total
        );
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    #[test]
    fn test_matching_layout_has_no_mismatches() {
        let entries = [
            entry(0, wgpu::BufferBindingType::Storage { read_only: false }),
            entry(1, wgpu::BufferBindingType::Storage { read_only: false }),
        ];
        assert_eq!(validate_bind_group(FrameStage::Mesher, &entries), 0);
    }

    #[test]
    fn test_wrong_type_missing_and_extra_are_counted() {
        let entries = [
            entry(0, wgpu::BufferBindingType::Uniform),
            entry(7, wgpu::BufferBindingType::Uniform),
        ];
        // binding 0 wrong type, binding 1 missing, binding 7 extra
        assert_eq!(validate_bind_group(FrameStage::Paint, &entries), 3);
    }

    #[test]
    fn test_bindings_are_dense_from_zero() {
        for stage in FrameStage::ALL {
            for (i, b) in expected_bindings(stage).iter().enumerate() {
                assert_eq!(b.binding, i as u32, "{}", stage.name());
            }
        }
    }
}
