use std::fmt;
use std::str::FromStr;

use crate::archive::ArchiveRecord;

use super::exit::{Direction, ExitRule, hm};

/// Phase1 sells at the first valid print of the afternoon session.
pub const PHASE1_EXIT: ExitRule = ExitRule::FirstCloseFrom(hm(11, 30));

pub const MORNING_EARLY_EXIT: ExitRule = ExitRule::SlotClose {
    start: hm(9, 0),
    end: hm(10, 25),
    fallback_open_from: Some(hm(10, 30)),
};

pub const AFTERNOON_EARLY_EXIT: ExitRule = ExitRule::SlotClose {
    start: hm(12, 30),
    end: hm(14, 45),
    fallback_open_from: Some(hm(14, 50)),
};

/// The eleven intraday checkpoints, short basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSegment {
    S0930,
    S1000,
    S1030,
    S1100,
    S1130,
    S1300,
    S1330,
    S1400,
    S1430,
    S1500,
    S1530,
}

impl TimeSegment {
    pub const ALL: [TimeSegment; 11] = [
        TimeSegment::S0930,
        TimeSegment::S1000,
        TimeSegment::S1030,
        TimeSegment::S1100,
        TimeSegment::S1130,
        TimeSegment::S1300,
        TimeSegment::S1330,
        TimeSegment::S1400,
        TimeSegment::S1430,
        TimeSegment::S1500,
        TimeSegment::S1530,
    ];

    pub fn column(self) -> &'static str {
        match self {
            TimeSegment::S0930 => "seg_0930",
            TimeSegment::S1000 => "seg_1000",
            TimeSegment::S1030 => "seg_1030",
            TimeSegment::S1100 => "seg_1100",
            TimeSegment::S1130 => "seg_1130",
            TimeSegment::S1300 => "seg_1300",
            TimeSegment::S1330 => "seg_1330",
            TimeSegment::S1400 => "seg_1400",
            TimeSegment::S1430 => "seg_1430",
            TimeSegment::S1500 => "seg_1500",
            TimeSegment::S1530 => "seg_1530",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSegment::S0930 => "09:30",
            TimeSegment::S1000 => "10:00",
            TimeSegment::S1030 => "10:30",
            TimeSegment::S1100 => "11:00",
            TimeSegment::S1130 => "11:30 (morning close)",
            TimeSegment::S1300 => "13:00",
            TimeSegment::S1330 => "13:30",
            TimeSegment::S1400 => "14:00",
            TimeSegment::S1430 => "14:30",
            TimeSegment::S1500 => "15:00",
            TimeSegment::S1530 => "15:30 (close)",
        }
    }

    pub fn exit_rule(self) -> ExitRule {
        match self {
            TimeSegment::S0930 => ExitRule::OpenAt(hm(9, 30)),
            TimeSegment::S1000 => ExitRule::OpenAt(hm(10, 0)),
            TimeSegment::S1030 => ExitRule::OpenAt(hm(10, 30)),
            TimeSegment::S1100 => ExitRule::OpenAt(hm(11, 0)),
            TimeSegment::S1130 => PHASE1_EXIT,
            TimeSegment::S1300 => ExitRule::OpenAt(hm(13, 0)),
            TimeSegment::S1330 => ExitRule::OpenAt(hm(13, 30)),
            TimeSegment::S1400 => ExitRule::OpenAt(hm(14, 0)),
            TimeSegment::S1430 => ExitRule::OpenAt(hm(14, 30)),
            TimeSegment::S1500 => ExitRule::OpenAt(hm(15, 0)),
            TimeSegment::S1530 => ExitRule::DailyClose,
        }
    }

    pub fn get(self, rec: &ArchiveRecord) -> Option<f64> {
        match self {
            TimeSegment::S0930 => rec.seg_0930,
            TimeSegment::S1000 => rec.seg_1000,
            TimeSegment::S1030 => rec.seg_1030,
            TimeSegment::S1100 => rec.seg_1100,
            TimeSegment::S1130 => rec.seg_1130,
            TimeSegment::S1300 => rec.seg_1300,
            TimeSegment::S1330 => rec.seg_1330,
            TimeSegment::S1400 => rec.seg_1400,
            TimeSegment::S1430 => rec.seg_1430,
            TimeSegment::S1500 => rec.seg_1500,
            TimeSegment::S1530 => rec.seg_1530,
        }
    }

    pub fn slot(self, rec: &mut ArchiveRecord) -> &mut Option<f64> {
        match self {
            TimeSegment::S0930 => &mut rec.seg_0930,
            TimeSegment::S1000 => &mut rec.seg_1000,
            TimeSegment::S1030 => &mut rec.seg_1030,
            TimeSegment::S1100 => &mut rec.seg_1100,
            TimeSegment::S1130 => &mut rec.seg_1130,
            TimeSegment::S1300 => &mut rec.seg_1300,
            TimeSegment::S1330 => &mut rec.seg_1330,
            TimeSegment::S1400 => &mut rec.seg_1400,
            TimeSegment::S1430 => &mut rec.seg_1430,
            TimeSegment::S1500 => &mut rec.seg_1500,
            TimeSegment::S1530 => &mut rec.seg_1530,
        }
    }
}

/// Every stored profit column of an archive row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfitColumn {
    MorningEarly,
    Phase1,
    AfternoonEarly,
    Phase2,
    Segment(TimeSegment),
}

impl ProfitColumn {
    /// The four-segment exits, in session order.
    pub const FOUR_SEGMENTS: [ProfitColumn; 4] = [
        ProfitColumn::MorningEarly,
        ProfitColumn::Phase1,
        ProfitColumn::AfternoonEarly,
        ProfitColumn::Phase2,
    ];

    pub fn all() -> Vec<ProfitColumn> {
        Self::FOUR_SEGMENTS
            .into_iter()
            .chain(TimeSegment::ALL.into_iter().map(ProfitColumn::Segment))
            .collect()
    }

    pub fn column(self) -> &'static str {
        match self {
            ProfitColumn::MorningEarly => "profit_per_100_shares_morning_early",
            ProfitColumn::Phase1 => "profit_per_100_shares_phase1",
            ProfitColumn::AfternoonEarly => "profit_per_100_shares_afternoon_early",
            ProfitColumn::Phase2 => "profit_per_100_shares_phase2",
            ProfitColumn::Segment(seg) => seg.column(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfitColumn::MorningEarly => "morning early (10:25)",
            ProfitColumn::Phase1 => "phase1 (morning close)",
            ProfitColumn::AfternoonEarly => "afternoon early (14:45)",
            ProfitColumn::Phase2 => "phase2 (day close)",
            ProfitColumn::Segment(seg) => seg.label(),
        }
    }

    /// Side the stored value is booked on.
    pub fn direction(self) -> Direction {
        match self {
            ProfitColumn::Segment(_) => Direction::Short,
            _ => Direction::Long,
        }
    }

    pub fn exit_rule(self) -> ExitRule {
        match self {
            ProfitColumn::MorningEarly => MORNING_EARLY_EXIT,
            ProfitColumn::Phase1 => PHASE1_EXIT,
            ProfitColumn::AfternoonEarly => AFTERNOON_EARLY_EXIT,
            ProfitColumn::Phase2 => ExitRule::DailyClose,
            ProfitColumn::Segment(seg) => seg.exit_rule(),
        }
    }

    /// The stored value, on the column's own basis.
    pub fn value(self, rec: &ArchiveRecord) -> Option<f64> {
        match self {
            ProfitColumn::MorningEarly => rec.profit_per_100_shares_morning_early,
            ProfitColumn::Phase1 => rec.profit_per_100_shares_phase1,
            ProfitColumn::AfternoonEarly => rec.profit_per_100_shares_afternoon_early,
            ProfitColumn::Phase2 => rec.profit_per_100_shares_phase2,
            ProfitColumn::Segment(seg) => seg.get(rec),
        }
    }

    /// The value restated as a long trade.
    pub fn long_profit(self, rec: &ArchiveRecord) -> Option<f64> {
        let v = self.value(rec)?;
        Some(match self.direction() {
            Direction::Long => v,
            Direction::Short => -v,
        })
    }

    pub fn slot(self, rec: &mut ArchiveRecord) -> &mut Option<f64> {
        match self {
            ProfitColumn::MorningEarly => &mut rec.profit_per_100_shares_morning_early,
            ProfitColumn::Phase1 => &mut rec.profit_per_100_shares_phase1,
            ProfitColumn::AfternoonEarly => &mut rec.profit_per_100_shares_afternoon_early,
            ProfitColumn::Phase2 => &mut rec.profit_per_100_shares_phase2,
            ProfitColumn::Segment(seg) => seg.slot(rec),
        }
    }
}

impl fmt::Display for ProfitColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}

impl FromStr for ProfitColumn {
    type Err = String;

    /// Accepts the full column name or a short alias (`phase2`, `seg_1030`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let key = key.strip_prefix("profit_per_100_shares_").unwrap_or(&key);
        match key {
            "phase1" => Ok(ProfitColumn::Phase1),
            "phase2" => Ok(ProfitColumn::Phase2),
            "morning_early" => Ok(ProfitColumn::MorningEarly),
            "afternoon_early" => Ok(ProfitColumn::AfternoonEarly),
            other => TimeSegment::ALL
                .into_iter()
                .find(|seg| seg.column() == other)
                .map(ProfitColumn::Segment)
                .ok_or_else(|| format!("unknown profit column: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profit_column_aliases() {
        assert_eq!("phase2".parse::<ProfitColumn>(), Ok(ProfitColumn::Phase2));
        assert_eq!(
            "profit_per_100_shares_morning_early".parse::<ProfitColumn>(),
            Ok(ProfitColumn::MorningEarly)
        );
        assert_eq!(
            "SEG_1030".parse::<ProfitColumn>(),
            Ok(ProfitColumn::Segment(TimeSegment::S1030))
        );
        assert!("seg_1230".parse::<ProfitColumn>().is_err());
    }

    #[test]
    fn test_all_columns_are_distinct() {
        let all = ProfitColumn::all();
        assert_eq!(all.len(), 15);
        let mut names: Vec<&str> = all.iter().map(|c| c.column()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn test_slot_writes_are_visible_through_value() {
        let mut rec = ArchiveRecord::default();
        for (i, col) in ProfitColumn::all().into_iter().enumerate() {
            *col.slot(&mut rec) = Some(i as f64);
        }
        for (i, col) in ProfitColumn::all().into_iter().enumerate() {
            assert_eq!(col.value(&rec), Some(i as f64), "{col}");
        }
    }

    #[test]
    fn test_long_profit_flips_short_segments() {
        let rec = ArchiveRecord {
            profit_per_100_shares_phase2: Some(500.0),
            seg_1530: Some(-500.0),
            ..ArchiveRecord::default()
        };
        assert_eq!(ProfitColumn::Phase2.long_profit(&rec), Some(500.0));
        assert_eq!(
            ProfitColumn::Segment(TimeSegment::S1530).long_profit(&rec),
            Some(500.0)
        );
        assert_eq!(ProfitColumn::Phase1.long_profit(&rec), None);
    }

    #[test]
    fn test_close_segments_share_phase_rules() {
        assert_eq!(TimeSegment::S1130.exit_rule(), PHASE1_EXIT);
        assert_eq!(TimeSegment::S1530.exit_rule(), ExitRule::DailyClose);
        assert_eq!(ProfitColumn::Phase2.exit_rule(), ExitRule::DailyClose);
    }
}
