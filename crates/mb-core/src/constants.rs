/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Fields whose peak magnitude falls below this are left unnormalized
/// rather than blown up by a near-zero divisor.
pub const NORMALIZE_FLOOR: f64 = 1e-12;

/// Tolerance when checking that eigenvalues are nonnegative. Suppliers
/// routinely hand over -1e-15 for the constant mode.
pub const EIGENVALUE_TOLERANCE: f64 = 1e-9;

/// Name of the kernel family installed as the default for new kernel models.
pub const DEFAULT_KERNEL: &str = "heat";

/// Heat diffusion time used when the axis carries no usable scale.
pub const DEFAULT_HEAT_TAU: f64 = 1.0;
