//! Debug line collection for visualising energy transfers.
//!
//! Pure bookkeeping on the side of a pass: the collector sees every transfer
//! the calculator makes but never influences the result. Rendering the lines
//! is up to the host.

use crate::core_types::{ComponentData, ObjectHandle, Vec3};
use serde::{Deserialize, Serialize};

/// Colour of a transfer that is a negligible share of its target's heat
const LOW_SHARE_COLOR: [f32; 4] = [1.0, 1.0, 0.0, 1.0];

/// One energy transfer, as a line from sender to receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLineRecord {
    pub start: Vec3,
    pub end: Vec3,
    /// RGBA, yellow for a small share of the target's heat through to red for all of it
    pub color: [f32; 4],
    /// Energy moved by this transfer
    pub energy: f32,
    pub source: ObjectHandle,
    pub target: ObjectHandle,
    /// Share of the target's net energy for the pass, `0..=1`
    pub fraction: f32,
}

/// Gathers [`DebugLineRecord`]s during a pass
#[derive(Debug, Default)]
pub struct DebugRequestCollector {
    lines: Vec<DebugLineRecord>,
    targets: Vec<usize>,
    min_energy: f32,
}

impl DebugRequestCollector {
    /// Collector that ignores transfers below `min_energy`
    pub fn new(min_energy: f32) -> Self {
        Self {
            lines: Vec::new(),
            targets: Vec::new(),
            min_energy,
        }
    }

    /// Forget the previous pass
    pub fn begin_pass(&mut self) {
        self.lines.clear();
        self.targets.clear();
    }

    /// Note a transfer of `energy` from `sender` to the record at `target_index`
    pub fn record(
        &mut self,
        sender: &ComponentData,
        receiver: &ComponentData,
        target_index: usize,
        energy: f32,
    ) {
        if energy <= 0.0 || energy < self.min_energy {
            return;
        }
        let (Some(source), Some(target), Some(start), Some(end)) =
            (sender.owner, receiver.owner, sender.position, receiver.position)
        else {
            return;
        };

        self.lines.push(DebugLineRecord {
            start,
            end,
            color: LOW_SHARE_COLOR,
            energy,
            source,
            target,
            fraction: 0.0,
        });
        self.targets.push(target_index);
    }

    /// Fill in shares and colours once the final totals are known
    pub fn finish(&mut self, records: &[ComponentData]) {
        for (line, &target_index) in self.lines.iter_mut().zip(&self.targets) {
            let total = records
                .get(target_index)
                .map_or(0.0, |r| r.calculated_spread_energy);
            line.fraction = if total > 0.0 {
                (line.energy / total).clamp(0.0, 1.0)
            } else {
                0.0
            };
            line.color = share_color(line.fraction);
        }
    }

    pub fn lines(&self) -> &[DebugLineRecord] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Move the lines out, leaving the collector empty
    pub fn take_lines(&mut self) -> Vec<DebugLineRecord> {
        self.targets.clear();
        std::mem::take(&mut self.lines)
    }
}

fn share_color(fraction: f32) -> [f32; 4] {
    [1.0, 1.0 - fraction, 0.0, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ComponentData, ComponentData) {
        let sender = ComponentData::sender(ObjectHandle::new(0, 0), Vec3::zeros(), 10.0, 1.0, 2.0);
        let receiver = ComponentData::receiver(ObjectHandle::new(1, 0), Vec3::new(1.0, 0.0, 0.0));
        (sender, receiver)
    }

    #[test]
    fn test_fraction_and_color() {
        let (sender, mut receiver) = pair();
        let mut collector = DebugRequestCollector::new(0.0);
        collector.begin_pass();
        collector.record(&sender, &receiver, 1, 2.0);

        receiver.calculated_spread_energy = 8.0;
        collector.finish(&[sender, receiver]);

        let line = &collector.lines()[0];
        assert_eq!(line.fraction, 0.25);
        assert_eq!(line.color, [1.0, 0.75, 0.0, 1.0]);
        assert_eq!(line.end, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_threshold_and_zero_transfers_skipped() {
        let (sender, receiver) = pair();
        let mut collector = DebugRequestCollector::new(1.0);
        collector.record(&sender, &receiver, 1, 0.0);
        collector.record(&sender, &receiver, 1, 0.5);
        assert!(collector.is_empty());

        collector.record(&sender, &receiver, 1, 1.5);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_begin_pass_replaces_lines() {
        let (sender, receiver) = pair();
        let mut collector = DebugRequestCollector::new(0.0);
        collector.record(&sender, &receiver, 1, 1.0);
        collector.begin_pass();
        assert!(collector.is_empty());

        collector.record(&sender, &receiver, 1, 1.0);
        let taken = collector.take_lines();
        assert_eq!(taken.len(), 1);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_cooled_target_has_zero_fraction() {
        let (sender, receiver) = pair();
        let mut collector = DebugRequestCollector::new(0.0);
        collector.record(&sender, &receiver, 1, 3.0);
        collector.finish(&[sender, receiver]);
        assert_eq!(collector.lines()[0].fraction, 0.0);
    }
}
