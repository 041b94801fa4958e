pub mod assessment;
pub mod development;
