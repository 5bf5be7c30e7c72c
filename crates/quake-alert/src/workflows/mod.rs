pub mod alerts;
pub mod usgs;
