//! One spread pass over a frozen snapshot of records.
//!
//! Every burning sender looks up receivers within `max(hard, soft)` radius and
//! pushes heat into them with distance falloff. Contributions are summed per
//! receiver, cooling is taken off, and the running heat stock is checked
//! against the ignition, destruction and explosion thresholds.
//!
//! Transfers are gathered per sender and summed in ascending sender order, so
//! a pass is deterministic for a given snapshot and the per-receiver totals do
//! not depend on the order senders appear in (up to float rounding).

use crate::core_types::{BurnStage, ComponentData, SpatialLookup};
use crate::spread::config::SpreadConfig;
use crate::spread::debug::DebugRequestCollector;
use crate::spread::falloff::{apply_resistance, falloff_factor, sanitize};
use tracing::debug;

/// Heat moved from one record to another in a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub sender: usize,
    pub receiver: usize,
    pub energy: f32,
}

/// Counters describing one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub records: usize,
    pub senders: usize,
    pub transfers: usize,
    pub ignited: usize,
    pub destroyed: usize,
    pub exploded: usize,
}

/// Runs spread passes. Keeps its scratch buffers between passes.
#[derive(Debug, Default)]
pub struct SpreadCalculator {
    config: SpreadConfig,
    senders: Vec<usize>,
    /// Rayon workers keep their own candidate buffers
    #[cfg(not(feature = "parallel"))]
    candidates: Vec<usize>,
    transfers: Vec<Transfer>,
    incoming: Vec<f32>,
}

impl SpreadCalculator {
    pub fn new(config: SpreadConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SpreadConfig) {
        self.config = config;
    }

    /// Transfers made by the last pass, ordered by sender then receiver
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Run one pass over `records`, simulating `seconds_passed` of heating.
    ///
    /// Rebuilds `lookup` from the records first. Results are written into the
    /// records themselves: `calculated_spread_energy`, `accumulated_energy`,
    /// `source` and the burn flags.
    pub fn calculate(
        &mut self,
        records: &mut [ComponentData],
        lookup: &mut dyn SpatialLookup,
        seconds_passed: f32,
        mut debug_lines: Option<&mut DebugRequestCollector>,
    ) -> PassSummary {
        let seconds = sanitize(seconds_passed);

        for record in records.iter_mut() {
            record.calculated_spread_energy = 0.0;
        }
        lookup.rebuild(records);
        let lookup: &dyn SpatialLookup = lookup;

        self.senders.clear();
        self.senders.extend(
            records
                .iter()
                .enumerate()
                .filter(|(_, record)| record.can_send())
                .map(|(index, _)| index),
        );

        // Gather
        self.transfers.clear();
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let view: &[ComponentData] = records;
            let lookup: &dyn SpatialLookup = lookup;
            let config = &self.config;
            let gathered: Vec<Vec<Transfer>> = self
                .senders
                .par_iter()
                .map_init(Vec::new, |candidates, &sender| {
                    let mut out = Vec::new();
                    gather_transfers(view, sender, lookup, config, seconds, candidates, &mut out);
                    out
                })
                .collect();
            self.transfers.extend(gathered.into_iter().flatten());
        }
        #[cfg(not(feature = "parallel"))]
        {
            for &sender in &self.senders {
                gather_transfers(
                    records,
                    sender,
                    lookup,
                    &self.config,
                    seconds,
                    &mut self.candidates,
                    &mut self.transfers,
                );
            }
        }

        // Accumulate
        self.incoming.clear();
        self.incoming.resize(records.len(), 0.0);
        for transfer in &self.transfers {
            self.incoming[transfer.receiver] += transfer.energy;
            let sender_owner = records[transfer.sender].owner;
            let receiver = &mut records[transfer.receiver];
            if receiver.source.is_none() {
                receiver.source = sender_owner;
            }
        }

        if let Some(collector) = debug_lines.as_deref_mut() {
            collector.begin_pass();
            for transfer in &self.transfers {
                collector.record(
                    &records[transfer.sender],
                    &records[transfer.receiver],
                    transfer.receiver,
                    transfer.energy,
                );
            }
        }

        // Cool down and check thresholds
        let mut summary = PassSummary {
            records: records.len(),
            senders: self.senders.len(),
            transfers: self.transfers.len(),
            ..PassSummary::default()
        };
        for (index, record) in records.iter_mut().enumerate() {
            if !record.is_valid() || !record.is_fire_receiver {
                record.direct_energy = 0.0;
                continue;
            }

            let incoming = self.incoming[index] + sanitize(record.direct_energy);
            let cooling =
                sanitize(record.cooling_energy) * self.config.cooling_multiplier * seconds;
            let net = (incoming - cooling).max(0.0);
            let leftover_cooling = (cooling - incoming).max(0.0);

            record.direct_energy = 0.0;
            record.calculated_spread_energy = net;
            record.accumulated_energy =
                (sanitize(record.accumulated_energy) - leftover_cooling).max(0.0) + net;

            let before = record.stage();
            let reached = threshold_stage(&self.config, record.accumulated_energy);
            if record.upgrade_to(reached) {
                let after = record.stage();
                if before < BurnStage::Burning {
                    summary.ignited += 1;
                }
                if before < BurnStage::Destroyed && after >= BurnStage::Destroyed {
                    summary.destroyed += 1;
                }
                if before < BurnStage::Exploded && after >= BurnStage::Exploded {
                    summary.exploded += 1;
                }
            }
        }

        if let Some(collector) = debug_lines {
            collector.finish(records);
        }

        debug!(
            records = summary.records,
            senders = summary.senders,
            transfers = summary.transfers,
            ignited = summary.ignited,
            destroyed = summary.destroyed,
            exploded = summary.exploded,
            "Spread pass complete"
        );
        summary
    }
}

/// Highest stage whose threshold `energy` has reached
fn threshold_stage(config: &SpreadConfig, energy: f32) -> BurnStage {
    if config.explosion_threshold.is_some_and(|t| energy >= t) {
        BurnStage::Exploded
    } else if energy >= config.destruction_threshold {
        BurnStage::Destroyed
    } else if energy >= config.ignition_threshold {
        BurnStage::Burning
    } else {
        BurnStage::Unburnt
    }
}

/// Append every transfer made by the sender at `sender` to `out`
fn gather_transfers(
    records: &[ComponentData],
    sender: usize,
    lookup: &dyn SpatialLookup,
    config: &SpreadConfig,
    seconds: f32,
    candidates: &mut Vec<usize>,
    out: &mut Vec<Transfer>,
) {
    let source = &records[sender];
    let Some(center) = source.position else {
        return;
    };

    lookup.find_nearby(center, source.query_radius(), candidates);
    // Lookups may over-report; never count a receiver twice
    candidates.sort_unstable();
    candidates.dedup();

    let output = sanitize(source.fire_energy) * sanitize(config.fire_energy_multiplier) * seconds;
    if output <= 0.0 {
        return;
    }

    for &target in candidates.iter() {
        if target == sender {
            continue;
        }
        let Some(receiver) = records.get(target) else {
            continue;
        };
        if !receiver.can_receive() || receiver.owner == source.owner {
            continue;
        }
        let Some(position) = receiver.position else {
            continue;
        };

        let distance = (position - center).norm();
        let factor = falloff_factor(distance, source.hard_radius, source.soft_radius, config.falloff);
        if factor <= 0.0 {
            continue;
        }

        let energy = apply_resistance(output * factor, receiver.fire_resistance, seconds, config.resistance);
        if energy > 0.0 && energy.is_finite() {
            out.push(Transfer {
                sender,
                receiver: target,
                energy,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{LinearScan, ObjectHandle, SpatialIndex, Vec3};
    use approx::assert_relative_eq;

    fn handle(index: u32) -> ObjectHandle {
        ObjectHandle::new(index, 0)
    }

    fn sender_at_origin() -> ComponentData {
        ComponentData::sender(handle(0), Vec3::zeros(), 10.0, 2.0, 5.0).with_receiver(false)
    }

    fn run(records: &mut [ComponentData], config: SpreadConfig, seconds: f32) -> PassSummary {
        let mut calculator = SpreadCalculator::new(config);
        let mut lookup = SpatialIndex::new(4.0);
        calculator.calculate(records, &mut lookup, seconds, None)
    }

    #[test]
    fn test_full_transfer_inside_hard_radius() {
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(1.0, 0.0, 0.0)),
        ];
        let summary = run(&mut records, SpreadConfig::default(), 1.0);

        assert_eq!(records[1].calculated_spread_energy, 10.0);
        assert_eq!(records[1].accumulated_energy, 10.0);
        assert_eq!(records[1].source, Some(handle(0)));
        assert_eq!(summary.senders, 1);
        assert_eq!(summary.transfers, 1);
    }

    #[test]
    fn test_falloff_band_and_elapsed_time() {
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(0.0, 3.5, 0.0)),
        ];
        run(&mut records, SpreadConfig::default(), 0.5);

        // Halfway through the band, half a second
        assert_relative_eq!(records[1].calculated_spread_energy, 2.5, epsilon = 1e-5);
    }

    #[test]
    fn test_nothing_beyond_soft_radius() {
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(8.0, 0.0, 0.0)),
        ];
        let summary = run(&mut records, SpreadConfig::default(), 1.0);

        assert_eq!(records[1].calculated_spread_energy, 0.0);
        assert_eq!(records[1].source, None);
        assert_eq!(summary.transfers, 0);
    }

    #[test]
    fn test_distance_rechecked_against_over_reporting_lookup() {
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(6.0, 0.0, 0.0)),
        ];

        // Reports every record, twice
        struct Everything(usize);
        impl SpatialLookup for Everything {
            fn rebuild(&mut self, records: &[ComponentData]) {
                self.0 = records.len();
            }
            fn find_nearby(&self, _center: Vec3, _radius: f32, out: &mut Vec<usize>) {
                out.clear();
                out.extend(0..self.0);
                out.extend(0..self.0);
            }
        }

        let mut calculator = SpreadCalculator::new(SpreadConfig::default());
        calculator.calculate(&mut records, &mut Everything(0), 1.0, None);
        assert_eq!(records[1].calculated_spread_energy, 0.0);

        records[1].position = Some(Vec3::new(1.0, 0.0, 0.0));
        calculator.calculate(&mut records, &mut Everything(0), 1.0, None);
        assert_eq!(records[1].calculated_spread_energy, 10.0, "duplicates counted once");
    }

    #[test]
    fn test_no_self_transfer() {
        let mut records = vec![ComponentData::sender(handle(0), Vec3::zeros(), 10.0, 2.0, 5.0)];
        run(&mut records, SpreadConfig::default(), 1.0);
        assert_eq!(records[0].calculated_spread_energy, 0.0);
    }

    #[test]
    fn test_cooling_caps_at_zero_and_drains_stock() {
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(1.0, 0.0, 0.0))
                .with_cooling(15.0)
                .with_accumulated_energy(20.0),
        ];
        run(&mut records, SpreadConfig::default(), 1.0);

        assert_eq!(records[1].calculated_spread_energy, 0.0);
        // 10 in, 15 out: the remaining 5 cools the existing stock
        assert_eq!(records[1].accumulated_energy, 15.0);
    }

    #[test]
    fn test_stages_can_be_skipped() {
        let config = SpreadConfig {
            ignition_threshold: 5.0,
            destruction_threshold: 8.0,
            explosion_threshold: Some(9.0),
            ..Default::default()
        };
        let mut records = vec![
            sender_at_origin(),
            ComponentData::receiver(handle(1), Vec3::new(1.0, 0.0, 0.0)),
        ];
        let summary = run(&mut records, config, 1.0);

        assert!(records[1].is_burning);
        assert!(records[1].is_destroyed);
        assert!(records[1].is_exploded);
        assert_eq!(summary.ignited, 1);
        assert_eq!(summary.destroyed, 1);
        assert_eq!(summary.exploded, 1);
    }

    #[test]
    fn test_direct_energy_without_position() {
        let config = SpreadConfig {
            ignition_threshold: 5.0,
            ..Default::default()
        };
        let mut records = vec![ComponentData::new(handle(3)).with_direct_energy(6.0)];
        let summary = run(&mut records, config, 1.0);

        assert_eq!(records[0].calculated_spread_energy, 6.0);
        assert_eq!(records[0].direct_energy, 0.0);
        assert!(records[0].is_burning);
        assert_eq!(summary.ignited, 1);
    }

    #[test]
    fn test_destroyed_sender_stops_emitting() {
        let mut sender = sender_at_origin();
        sender.is_destroyed = true;
        let mut records = vec![
            sender,
            ComponentData::receiver(handle(1), Vec3::new(1.0, 0.0, 0.0)),
        ];
        let summary = run(&mut records, SpreadConfig::default(), 1.0);
        assert_eq!(summary.senders, 0);
        assert_eq!(records[1].calculated_spread_energy, 0.0);
    }

    #[test]
    fn test_first_sender_in_index_order_is_source() {
        let mut records = vec![
            ComponentData::receiver(handle(9), Vec3::zeros()),
            ComponentData::sender(handle(1), Vec3::new(1.0, 0.0, 0.0), 1.0, 2.0, 3.0).with_receiver(false),
            ComponentData::sender(handle(2), Vec3::new(-1.0, 0.0, 0.0), 50.0, 2.0, 3.0).with_receiver(false),
        ];
        let mut calculator = SpreadCalculator::new(SpreadConfig::default());
        calculator.calculate(&mut records, &mut LinearScan::new(), 1.0, None);

        assert_eq!(records[0].source, Some(handle(1)));
        assert_eq!(records[0].calculated_spread_energy, 51.0);
        assert_eq!(calculator.transfers().len(), 2);
    }

    #[test]
    fn test_debug_lines_recorded_with_fractions() {
        let mut records = vec![
            ComponentData::receiver(handle(9), Vec3::zeros()),
            ComponentData::sender(handle(1), Vec3::new(1.0, 0.0, 0.0), 1.0, 2.0, 3.0).with_receiver(false),
            ComponentData::sender(handle(2), Vec3::new(-1.0, 0.0, 0.0), 3.0, 2.0, 3.0).with_receiver(false),
        ];
        let mut calculator = SpreadCalculator::new(SpreadConfig::default());
        let mut collector = DebugRequestCollector::new(0.0);
        calculator.calculate(&mut records, &mut LinearScan::new(), 1.0, Some(&mut collector));

        let lines = collector.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].source, handle(1));
        assert_relative_eq!(lines[0].fraction, 0.25);
        assert_relative_eq!(lines[1].fraction, 0.75);
    }
}
