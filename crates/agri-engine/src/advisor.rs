//! Irrigation guidance from the latest reading and crop profiles

use crate::{EngineError, EngineResult};
use agri_core::{CurrentConditions, IrrigationRecommendation, Reading};
use agri_store::ReadingStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Rain rate at or above which irrigation is suppressed (mm/h)
const RAIN_SUPPRESSION_RATE: f64 = 1.0;

/// Temperature above which the suggested volume is scaled up (°C)
const HEAT_SCALING_TEMP: f64 = 30.0;

/// Soil-moisture floor applied when the crop type is unrecognized (%)
pub const DEFAULT_CROP_FLOOR: f64 = 30.0;

/// Irrigation tuning: volume coefficients and per-crop moisture floors
#[derive(Debug, Clone)]
pub struct IrrigationConfig {
    /// Liters per percentage point of moisture deficit per unit field area
    pub area_coefficient: f64,
    /// Fractional volume increase applied above the heat scaling temperature
    pub heat_factor: f64,
    /// Minimum acceptable soil moisture per crop type (%)
    pub crop_floors: HashMap<String, f64>,
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        let crop_floors = [
            ("general", 30.0),
            ("wheat", 35.0),
            ("maize", 40.0),
            ("tomato", 45.0),
            ("potato", 40.0),
            ("rice", 60.0),
        ]
        .into_iter()
        .map(|(crop, floor)| (crop.to_string(), floor))
        .collect();

        Self {
            area_coefficient: 0.5,
            heat_factor: 0.2,
            crop_floors,
        }
    }
}

/// Derives watering recommendations from the latest stored reading
#[derive(Clone)]
pub struct IrrigationAdvisor {
    store: Arc<dyn ReadingStore>,
    config: IrrigationConfig,
}

impl IrrigationAdvisor {
    pub fn new(store: Arc<dyn ReadingStore>, config: IrrigationConfig) -> Self {
        Self { store, config }
    }

    /// Moisture floor for a crop type, falling back to the general floor
    pub fn crop_floor(&self, crop_type: &str) -> f64 {
        self.config
            .crop_floors
            .get(crop_type)
            .copied()
            .unwrap_or(DEFAULT_CROP_FLOOR)
    }

    /// Recommendation for the device's latest reading. Fails with
    /// `NoData` when the device has no readings at all.
    pub async fn recommend(
        &self,
        device_id: &str,
        crop_type: &str,
    ) -> EngineResult<IrrigationRecommendation> {
        let reading = self
            .store
            .latest_reading(device_id)
            .await?
            .ok_or_else(|| EngineError::NoData(device_id.to_string()))?;

        Ok(self.recommend_from(&reading, crop_type))
    }

    /// Decision rule: irrigate iff soil moisture is below the crop floor
    /// and no meaningful rain is falling. Ongoing rain suppresses the
    /// recommendation even under low moisture.
    pub fn recommend_from(&self, reading: &Reading, crop_type: &str) -> IrrigationRecommendation {
        let floor = self.crop_floor(crop_type);
        let raining = reading
            .rainfall
            .map_or(false, |rate| rate >= RAIN_SUPPRESSION_RATE);

        let (needs_irrigation, recommendation, liters) = match reading.soil_moisture {
            None => (
                false,
                "No soil moisture measurement available - unable to assess irrigation need"
                    .to_string(),
                None,
            ),
            Some(moisture) if moisture < floor && raining => (
                false,
                "Recent rainfall detected - no irrigation needed".to_string(),
                None,
            ),
            Some(moisture) if moisture < floor => {
                let deficit = floor - moisture;
                let mut liters = deficit * self.config.area_coefficient;
                if reading.temperature.map_or(false, |t| t > HEAT_SCALING_TEMP) {
                    liters *= 1.0 + self.config.heat_factor;
                }
                (
                    true,
                    "Irrigation recommended - soil moisture is low".to_string(),
                    Some(liters),
                )
            }
            Some(_) => (
                false,
                "Soil moisture levels are adequate".to_string(),
                None,
            ),
        };

        IrrigationRecommendation {
            device_id: reading.device_id.clone(),
            crop_type: crop_type.to_string(),
            current_conditions: CurrentConditions::from(reading),
            needs_irrigation,
            recommendation,
            suggested_water_amount_liters: liters,
        }
    }
}
