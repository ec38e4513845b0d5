//! Seeded flight generator.

use apron_core::{AircraftClass, NewFlight};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const AIRLINES: [&str; 10] = ["AV", "LA", "DL", "UA", "AA", "IB", "AF", "KL", "LH", "BA"];
const AIRPORTS: [&str; 8] = ["BOG", "MDE", "LIM", "MIA", "JFK", "MAD", "CDG", "AMS"];

/// Class mix in percent: narrow 60, wide 30, jumbo 10.
const CLASS_WEIGHTS: [(AircraftClass, u32); 3] = [
    (AircraftClass::NarrowBody, 60),
    (AircraftClass::WideBody, 30),
    (AircraftClass::Jumbo, 10),
];

/// Generates distinct, valid flights from a fixed seed so runs repeat.
pub struct TrafficGenerator {
    rng: StdRng,
    issued: HashSet<String>,
}

impl TrafficGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    pub fn next_flight(&mut self) -> NewFlight {
        let class = self.aircraft_class();
        let airline = AIRLINES[self.rng.gen_range(0..AIRLINES.len())];
        let number = self.flight_number(airline);
        let origin = AIRPORTS[self.rng.gen_range(0..AIRPORTS.len())];
        NewFlight::new(number, class).with_route(origin, "BOG", airline)
    }

    pub fn aircraft_class(&mut self) -> AircraftClass {
        let total: u32 = CLASS_WEIGHTS.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen_range(0..total);
        for (class, weight) in CLASS_WEIGHTS {
            if roll < weight {
                return class;
            }
            roll -= weight;
        }
        AircraftClass::NarrowBody
    }

    /// `true` with probability `share`, clamped to [0, 1].
    pub fn chance(&mut self, share: f64) -> bool {
        self.rng.gen_bool(share.clamp(0.0, 1.0))
    }

    fn flight_number(&mut self, airline: &str) -> String {
        loop {
            let candidate = format!("{}{:03}", airline, self.rng.gen_range(0..1000));
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
