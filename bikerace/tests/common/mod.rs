#![allow(dead_code)]

use bikerace::core::competitor::Competitor;
use bikerace::core::controller::ControllerOpts;
use bikerace::core::sequence::SequenceTiming;
use bikerace::interfaces::api::{CompetitorDescriptor, CompetitorRecord, WeightType};
use bikerace::pre::read_catalog::Catalog;

pub fn record(
    id: u64,
    make: &str,
    model: &str,
    power: f64,
    torque: f64,
    weight: f64,
    weight_type: WeightType,
) -> CompetitorRecord {
    CompetitorRecord {
        id,
        full_name: format!("{} {}", make, model),
        make: make.to_owned(),
        model: model.to_owned(),
        power,
        torque,
        weight,
        weight_type,
        style: "naked".to_owned(),
        year: None,
    }
}

pub fn competitor(id: u64, name: &str, power: f64, torque: f64, weight: f64) -> Competitor {
    let (make, model) = name.split_once(' ').unwrap_or((name, name));
    Competitor::from_record(&record(id, make, model, power, torque, weight, WeightType::Wet))
        .unwrap()
}

pub fn catalog() -> Catalog {
    Catalog {
        racers: vec![
            record(1, "Bike", "A", 120.0, 120.0, 233.0, WeightType::Wet),
            record(2, "Bike", "B", 120.0, 79.0, 188.0, WeightType::Wet),
            record(3, "Yamaha", "MT-07", 73.0, 67.0, 164.0, WeightType::Dry),
            record(4, "Broken", "Bike", 0.0, 50.0, 150.0, WeightType::Wet),
        ],
    }
}

pub fn desc(make: &str, model: &str) -> CompetitorDescriptor {
    CompetitorDescriptor::new(make, model, None)
}

pub fn fast_opts() -> ControllerOpts {
    ControllerOpts {
        timing: SequenceTiming::fast_forward(),
        ..ControllerOpts::default()
    }
}
