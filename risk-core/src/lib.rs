//! HealthScore core: dashboard logic, scenario scoring and the NPPES model pipeline

pub mod constants;
pub mod logic;
