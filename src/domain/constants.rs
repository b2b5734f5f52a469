//! Process-wide numerical constants.

/// Speed of light in vacuum, km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Default relative step tolerance for the Gaussian fitter.
pub const DEFAULT_FIT_TOLERANCE: f64 = 1e-8;

/// Default iteration cap for the Gaussian fitter.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Default running-median window (bins) for continuum estimation.
pub const DEFAULT_MEDIAN_WINDOW: usize = 101;

/// Continuum values below this fraction of the largest continuum magnitude
/// are treated as zero in divide mode.
pub const DEFAULT_MIN_CONTINUUM: f64 = 1e-10;

/// Free parameters of the Gaussian-plus-baseline model.
pub const GAUSSIAN_PARAM_COUNT: usize = 4;

/// `2 * sqrt(2 * ln 2)`: FWHM / sigma for a Gaussian.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;
