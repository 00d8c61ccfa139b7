//! Observation geometry and optics configuration.
//!
//! A [`DisperseConfig`] fixes everything needed to map a theory cube onto a
//! detector frame: the cube and frame extents and pixel scales, the aperture
//! and exposure used for flux normalization, and, for slitless spectroscopy,
//! the grism's linear dispersion law.
//!
//! # Physics
//!
//! - **Collecting area**: A = π(D/2)², D in cm
//! - **Flux scale**: A · t_exp / gain, applied to every response weight
//! - **Dispersion**: a slice with mean wavelength λ (nm) is shifted by
//!   `(λ · R_spec / 500 + offset)` observed pixels along the dispersion angle
//!
//! The serialized form uses the same keys as the configuration dictionaries
//! handed over by the binding layer (`model_Nx`, `R_spec`, ...).

use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::image_size::{CubeShape, PixelShape};

use crate::error::{GrismError, Result};

/// Reference wavelength (nm) of the linear dispersion law.
pub const DISPERSION_REFERENCE_NM: f64 = 500.0;

/// Linear grism dispersion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrismParams {
    /// Spectral resolving power at the reference wavelength
    pub r_spec: f64,
    /// Dispersion position angle in radians, measured from +x towards +y
    pub disp_ang_rad: f64,
    /// Constant trace offset in observed pixels
    pub offset_px: f64,
}

impl GrismParams {
    pub fn new(r_spec: f64, disp_ang_rad: f64, offset_px: f64) -> Self {
        Self {
            r_spec,
            disp_ang_rad,
            offset_px,
        }
    }

    /// Shift along the trace, in observed pixels, for a slice centered on `wavelength_nm`.
    pub fn trace_offset_px(&self, wavelength_nm: f64) -> f64 {
        wavelength_nm * (self.r_spec / DISPERSION_REFERENCE_NM) + self.offset_px
    }

    /// `(dx, dy)` shift in observed pixels for a slice centered on `wavelength_nm`.
    pub fn shift_px(&self, wavelength_nm: f64) -> (f64, f64) {
        let along = self.trace_offset_px(wavelength_nm);
        (
            along * self.disp_ang_rad.cos(),
            along * self.disp_ang_rad.sin(),
        )
    }
}

/// Geometry and optics of one observation.
///
/// Built once and never mutated in place; replacing a dispersed
/// observation's configuration goes through
/// [`ObservationGeometry::reconfigure`](crate::response::ObservationGeometry::reconfigure),
/// which also rebuilds its response table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDisperseConfig", into = "RawDisperseConfig")]
pub struct DisperseConfig {
    /// Theory cube extent (wavelength slices, rows, columns)
    pub model_shape: CubeShape,
    /// Theory cube pixel scale in arcsec/pixel
    pub model_scale: f64,
    /// Observed frame extent
    pub image_shape: PixelShape,
    /// Observed frame pixel scale in arcsec/pixel
    pub pix_scale: f64,
    /// Clear aperture diameter in cm
    pub diameter_cm: f64,
    /// Exposure time in seconds
    pub exp_time_s: f64,
    /// Detector gain
    pub gain: f64,
    /// Dispersion law; `None` for direct imaging
    pub grism: Option<GrismParams>,
}

impl DisperseConfig {
    /// Create a direct-imaging configuration (no dispersion).
    pub fn imaging(
        model_shape: CubeShape,
        model_scale: f64,
        image_shape: PixelShape,
        pix_scale: f64,
        diameter_cm: f64,
        exp_time_s: f64,
        gain: f64,
    ) -> Self {
        Self {
            model_shape,
            model_scale,
            image_shape,
            pix_scale,
            diameter_cm,
            exp_time_s,
            gain,
            grism: None,
        }
    }

    /// Same geometry with the given dispersion law attached.
    pub fn with_grism(mut self, grism: GrismParams) -> Self {
        self.grism = Some(grism);
        self
    }

    /// Dispersion law, or [`GrismError::MissingGrismParams`] for imaging configs.
    pub fn grism(&self) -> Result<&GrismParams> {
        self.grism.as_ref().ok_or(GrismError::MissingGrismParams)
    }

    pub fn is_dispersed(&self) -> bool {
        self.grism.is_some()
    }

    /// Collecting area in cm²
    pub fn collecting_area_cm2(&self) -> f64 {
        PI * (self.diameter_cm / 2.0).powi(2)
    }

    /// Normalization applied to every response weight: area × exposure / gain.
    pub fn flux_scale(&self) -> f64 {
        self.collecting_area_cm2() * self.exp_time_s / self.gain
    }

    /// Check extents and physical parameters.
    pub fn validate(&self) -> Result<()> {
        if self.model_shape.is_empty() {
            return Err(GrismError::InvalidConfig(format!(
                "theory cube shape {} has an empty axis",
                self.model_shape
            )));
        }
        if self.image_shape.is_empty() {
            return Err(GrismError::InvalidConfig(format!(
                "observed image shape {} has an empty axis",
                self.image_shape
            )));
        }

        let positive = [
            ("model_scale", self.model_scale),
            ("pix_scale", self.pix_scale),
            ("diameter", self.diameter_cm),
            ("exp_time", self.exp_time_s),
            ("gain", self.gain),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GrismError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        if let Some(g) = &self.grism {
            let finite = [
                ("R_spec", g.r_spec),
                ("disp_ang", g.disp_ang_rad),
                ("offset", g.offset_px),
            ];
            for (name, value) in finite {
                if !value.is_finite() {
                    return Err(GrismError::InvalidConfig(format!(
                        "{name} must be finite, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a configuration from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DisperseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Flat key/value layout used on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDisperseConfig {
    #[serde(rename = "model_Nx")]
    model_nx: usize,
    #[serde(rename = "model_Ny")]
    model_ny: usize,
    #[serde(rename = "model_Nlam")]
    model_nlam: usize,
    model_scale: f64,
    #[serde(rename = "Nx")]
    nx: usize,
    #[serde(rename = "Ny")]
    ny: usize,
    pix_scale: f64,
    diameter: f64,
    exp_time: f64,
    gain: f64,
    #[serde(rename = "R_spec", default, skip_serializing_if = "Option::is_none")]
    r_spec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disp_ang: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<f64>,
}

impl TryFrom<RawDisperseConfig> for DisperseConfig {
    type Error = GrismError;

    fn try_from(raw: RawDisperseConfig) -> Result<Self> {
        let grism = match (raw.r_spec, raw.disp_ang, raw.offset) {
            (Some(r_spec), Some(disp_ang), Some(offset)) => {
                Some(GrismParams::new(r_spec, disp_ang, offset))
            }
            (None, None, None) => None,
            _ => {
                return Err(GrismError::InvalidConfig(
                    "R_spec, disp_ang and offset must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            model_shape: CubeShape::new(raw.model_nlam, raw.model_ny, raw.model_nx),
            model_scale: raw.model_scale,
            image_shape: PixelShape::new(raw.nx, raw.ny),
            pix_scale: raw.pix_scale,
            diameter_cm: raw.diameter,
            exp_time_s: raw.exp_time,
            gain: raw.gain,
            grism,
        })
    }
}

impl From<DisperseConfig> for RawDisperseConfig {
    fn from(config: DisperseConfig) -> Self {
        Self {
            model_nx: config.model_shape.width,
            model_ny: config.model_shape.height,
            model_nlam: config.model_shape.nlam,
            model_scale: config.model_scale,
            nx: config.image_shape.width,
            ny: config.image_shape.height,
            pix_scale: config.pix_scale,
            diameter: config.diameter_cm,
            exp_time: config.exp_time_s,
            gain: config.gain,
            r_spec: config.grism.map(|g| g.r_spec),
            disp_ang: config.grism.map(|g| g.disp_ang_rad),
            offset: config.grism.map(|g| g.offset_px),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_config() -> DisperseConfig {
        DisperseConfig::imaging(
            CubeShape::new(1, 1, 1),
            1.0,
            PixelShape::new(1, 1),
            1.0,
            2.0,
            1.0,
            1.0,
        )
    }

    #[test]
    fn test_flux_scale_unit_aperture() {
        // 2 cm aperture, 1 s, unity gain -> π
        assert_relative_eq!(unit_config().flux_scale(), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_flux_scale_scales_with_exposure_and_gain() {
        let mut config = unit_config();
        config.exp_time_s = 10.0;
        config.gain = 2.0;
        assert_relative_eq!(config.flux_scale(), 5.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_dispersion_shift() {
        let g = GrismParams::new(500.0, 0.0, 2.0);
        let (dx, dy) = g.shift_px(1.5);
        assert_relative_eq!(dx, 3.5, epsilon = 1e-12);
        assert_relative_eq!(dy, 0.0, epsilon = 1e-12);

        let vertical = GrismParams::new(500.0, std::f64::consts::FRAC_PI_2, 0.0);
        let (dx, dy) = vertical.shift_px(2.0);
        assert!(dx.abs() < 1e-12);
        assert_relative_eq!(dy, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_resolution_has_no_shift() {
        let g = GrismParams::new(0.0, 0.3, 0.0);
        assert_eq!(g.shift_px(1234.0), (0.0, 0.0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(unit_config().validate().is_ok());

        let mut config = unit_config();
        config.gain = 0.0;
        assert!(matches!(config.validate(), Err(GrismError::InvalidConfig(_))));

        let mut config = unit_config();
        config.model_shape = CubeShape::new(0, 1, 1);
        assert!(matches!(config.validate(), Err(GrismError::InvalidConfig(_))));

        let mut config = unit_config();
        config.pix_scale = f64::NAN;
        assert!(matches!(config.validate(), Err(GrismError::InvalidConfig(_))));

        let config = unit_config().with_grism(GrismParams::new(f64::INFINITY, 0.0, 0.0));
        assert!(matches!(config.validate(), Err(GrismError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_grism_params() {
        assert!(matches!(
            unit_config().grism(),
            Err(GrismError::MissingGrismParams)
        ));
        let config = unit_config().with_grism(GrismParams::new(1.0, 0.0, 0.0));
        assert!(config.is_dispersed());
        assert_eq!(config.grism().unwrap().r_spec, 1.0);
    }

    #[test]
    fn test_parse_binding_layer_keys() {
        let json = r#"{
            "model_Nx": 64, "model_Ny": 32, "model_Nlam": 20, "model_scale": 0.05,
            "Nx": 40, "Ny": 20, "pix_scale": 0.13,
            "R_spec": 461.0, "disp_ang": 0.0, "offset": -275.0,
            "diameter": 240.0, "exp_time": 30.0, "gain": 1.0
        }"#;
        let config = DisperseConfig::from_json_str(json).unwrap();
        assert_eq!(config.model_shape, CubeShape::new(20, 32, 64));
        assert_eq!(config.image_shape, PixelShape::new(40, 20));
        let g = config.grism().unwrap();
        assert_eq!(g.r_spec, 461.0);
        assert_eq!(g.offset_px, -275.0);
    }

    #[test]
    fn test_parse_imaging_config_without_grism_keys() {
        let json = r#"{
            "model_Nx": 8, "model_Ny": 8, "model_Nlam": 1, "model_scale": 0.1,
            "Nx": 8, "Ny": 8, "pix_scale": 0.1,
            "diameter": 100.0, "exp_time": 1.0, "gain": 2.0
        }"#;
        let config = DisperseConfig::from_json_str(json).unwrap();
        assert!(!config.is_dispersed());
    }

    #[test]
    fn test_partial_grism_keys_rejected() {
        let json = r#"{
            "model_Nx": 8, "model_Ny": 8, "model_Nlam": 1, "model_scale": 0.1,
            "Nx": 8, "Ny": 8, "pix_scale": 0.1, "R_spec": 100.0,
            "diameter": 100.0, "exp_time": 1.0, "gain": 2.0
        }"#;
        assert!(DisperseConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_missing_required_key_rejected() {
        let json = r#"{
            "model_Nx": 8, "model_Ny": 8, "model_Nlam": 1, "model_scale": 0.1,
            "Nx": 8, "Ny": 8, "pix_scale": 0.1, "exp_time": 1.0, "gain": 2.0
        }"#;
        assert!(matches!(
            DisperseConfig::from_json_str(json),
            Err(GrismError::Json(_))
        ));
    }

    #[test]
    fn test_serialize_roundtrip_keeps_keys() {
        let config = unit_config().with_grism(GrismParams::new(300.0, 0.5, 1.0));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["model_Nlam"], 1);
        assert_eq!(json["R_spec"], 300.0);
        let back: DisperseConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);

        let imaging = serde_json::to_value(unit_config()).unwrap();
        assert!(imaging.get("R_spec").is_none());
    }
}
