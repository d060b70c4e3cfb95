//! Projection Technique Selection
//!
//! Every light resolves to exactly one [`ProjectionTechnique`] per frame.
//! Selection is a pure function of the light's requested technique and
//! quality, the global switches in [`ShadowSettings`] and the device's
//! [`DeviceCapabilities`].
//!
//! # Decision Order
//!
//! 1. Low effective quality or SM2-class hardware: 4-sample PCF
//!    (hardware PCF when available, manual otherwise).
//! 2. VSM, when requested by the light or enabled globally for
//!    default-technique lights.
//! 3. Branching PCF, when requested by the light or enabled globally for
//!    default-technique lights.
//! 4. 16-sample PCF: hardware PCF, then Fetch4, then manual.

use crate::renderer::settings::{DeviceCapabilities, DeviceFeatures, ShaderModel, ShadowSettings};
use crate::scene::light::{Light, ShadowFilterQuality, ShadowProjectionTechnique};

/// Quality tier of the branching PCF kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchingPcfQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionTechnique {
    FourSampleHwPcf,
    FourSampleManualPcf,
    SixteenSampleHwPcf,
    SixteenSampleFetch4,
    SixteenSampleManualPcf,
    Vsm,
    BranchingPcf(BranchingPcfQuality),
}

impl ProjectionTechnique {
    /// Number of uniform PCF taps, `0` for techniques without a fixed kernel.
    #[must_use]
    pub fn sample_count(self) -> usize {
        match self {
            Self::FourSampleHwPcf | Self::FourSampleManualPcf => 4,
            Self::SixteenSampleHwPcf | Self::SixteenSampleFetch4 | Self::SixteenSampleManualPcf => 16,
            Self::Vsm | Self::BranchingPcf(_) => 0,
        }
    }

    #[must_use]
    pub fn uses_hardware_pcf(self) -> bool {
        matches!(self, Self::FourSampleHwPcf | Self::SixteenSampleHwPcf)
    }

    #[must_use]
    pub fn uses_fetch4(self) -> bool {
        matches!(self, Self::SixteenSampleFetch4)
    }

    #[must_use]
    pub fn is_vsm(self) -> bool {
        matches!(self, Self::Vsm)
    }

    #[must_use]
    pub fn is_branching_pcf(self) -> bool {
        matches!(self, Self::BranchingPcf(_))
    }
}

/// Whether the light renders variance shadow maps.
#[must_use]
pub fn uses_vsm(light: &Light, settings: &ShadowSettings) -> bool {
    match light.shadow_projection_technique {
        ShadowProjectionTechnique::Vsm => true,
        ShadowProjectionTechnique::Default => settings.enable_vsm_shadows,
        _ => false,
    }
}

/// Whether the light uses branching PCF.
#[must_use]
pub fn uses_branching_pcf(light: &Light, settings: &ShadowSettings) -> bool {
    let technique = light.shadow_projection_technique;
    technique.is_branching_pcf()
        || (technique == ShadowProjectionTechnique::Default && settings.enable_branching_pcf_shadows)
}

/// Chooses the projection technique for `light`.
#[must_use]
pub fn select_projection_technique(
    light: &Light,
    settings: &ShadowSettings,
    caps: &DeviceCapabilities,
) -> ProjectionTechnique {
    let quality = light.shadow_filter_quality.biased(settings.filter_quality_bias);
    let hardware_pcf = caps.supports(DeviceFeatures::HARDWARE_PCF);

    if quality == ShadowFilterQuality::Low || caps.shader_model == ShaderModel::Sm2 {
        return if hardware_pcf {
            ProjectionTechnique::FourSampleHwPcf
        } else {
            ProjectionTechnique::FourSampleManualPcf
        };
    }

    if uses_vsm(light, settings) {
        return ProjectionTechnique::Vsm;
    }

    if uses_branching_pcf(light, settings) {
        let tier = match light.shadow_projection_technique {
            ShadowProjectionTechnique::BpcfLow => BranchingPcfQuality::Low,
            ShadowProjectionTechnique::BpcfMedium => BranchingPcfQuality::Medium,
            ShadowProjectionTechnique::BpcfHigh => BranchingPcfQuality::High,
            _ if quality == ShadowFilterQuality::High => BranchingPcfQuality::High,
            _ => BranchingPcfQuality::Medium,
        };
        return ProjectionTechnique::BranchingPcf(tier);
    }

    if hardware_pcf {
        ProjectionTechnique::SixteenSampleHwPcf
    } else if caps.supports(DeviceFeatures::FETCH4) {
        ProjectionTechnique::SixteenSampleFetch4
    } else {
        ProjectionTechnique::SixteenSampleManualPcf
    }
}
