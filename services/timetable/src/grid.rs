//! services/timetable/src/grid.rs
//!
//! The fixed weekly view: Monday to Friday across, periods 1 to 5 down.

use std::fmt;
use timetable_core::domain::{ClassSession, Subject, TimetableExport};

pub const DAY_NAMES: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];
pub const PERIODS: u32 = 5;

const CELL_WIDTH: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEntry {
    pub class: ClassSession,
    pub subject: Subject,
}

/// `cells[period - 1][day_of_week]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyGrid {
    cells: Vec<Vec<Option<GridEntry>>>,
}

impl WeeklyGrid {
    /// Places every class on the grid. Classes on a weekend, past the last
    /// period, or without a known subject are not shown.
    pub fn build(timetable: &TimetableExport) -> Self {
        let mut cells = vec![vec![None; DAY_NAMES.len()]; PERIODS as usize];

        for class in &timetable.classes {
            let day = usize::from(class.day_of_week);
            if day >= DAY_NAMES.len() || class.period == 0 || class.period > PERIODS {
                continue;
            }
            if let Some(subject) = timetable.subject(class.subject_id) {
                cells[class.period as usize - 1][day] = Some(GridEntry {
                    class: *class,
                    subject: subject.clone(),
                });
            }
        }

        Self { cells }
    }

    pub fn cell(&self, day_of_week: u8, period: u32) -> Option<&GridEntry> {
        let row = (period as usize).checked_sub(1)?;
        self.cells.get(row)?.get(usize::from(day_of_week))?.as_ref()
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

fn clip(text: &str) -> String {
    let mut clipped: String = text.chars().take(CELL_WIDTH).collect();
    if text.chars().count() > CELL_WIDTH {
        clipped.pop();
        clipped.push('~');
    }
    clipped
}

impl fmt::Display for WeeklyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3} ", "")?;
        for day in DAY_NAMES {
            write!(f, "| {:<width$} ", day, width = CELL_WIDTH)?;
        }
        writeln!(f, "|")?;

        for (row, cells) in self.cells.iter().enumerate() {
            // Subject name on the first line, room on the second.
            write!(f, "{:>3} ", row + 1)?;
            for cell in cells {
                let name = cell.as_ref().map(|e| clip(&e.subject.name)).unwrap_or_default();
                write!(f, "| {:<width$} ", name, width = CELL_WIDTH)?;
            }
            writeln!(f, "|")?;

            write!(f, "{:>3} ", "")?;
            for cell in cells {
                let room = cell
                    .as_ref()
                    .and_then(|e| e.subject.room.as_deref())
                    .map(clip)
                    .unwrap_or_default();
                write!(f, "| {:<width$} ", room, width = CELL_WIDTH)?;
            }
            writeln!(f, "|")?;
        }
        Ok(())
    }
}
