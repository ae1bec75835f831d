use std::collections::{BTreeMap, HashSet};

use ars_core::{FareClass, Seat};
use serde::Serialize;
use uuid::Uuid;

const HEURISTIC_COLUMNS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

#[derive(Debug, Clone, Serialize)]
pub struct SeatMapEntry {
    /// Persisted seat id; absent for generated layouts.
    pub id: Option<Uuid>,
    pub label: String,
    pub column: String,
    pub row: i32,
    pub cabin: FareClass,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatRow {
    pub row: i32,
    pub seats: Vec<SeatMapEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub rows: i32,
    pub seats_per_row: i32,
    pub rows_result: Vec<SeatRow>,
}

impl SeatMap {
    /// Persisted layout, each seat flagged against the seats held on the schedule.
    pub fn from_layout(seats: &[Seat], taken: &HashSet<Uuid>) -> Self {
        let mut by_row: BTreeMap<i32, Vec<&Seat>> = BTreeMap::new();
        for seat in seats {
            by_row.entry(seat.row_number).or_default().push(seat);
        }

        let rows_result: Vec<SeatRow> = by_row
            .into_iter()
            .map(|(row, mut seats)| {
                seats.sort_by(|a, b| a.column.cmp(&b.column));
                SeatRow {
                    row,
                    seats: seats
                        .into_iter()
                        .map(|s| SeatMapEntry {
                            id: Some(s.id),
                            label: s.label.clone(),
                            column: s.column.clone(),
                            row: s.row_number,
                            cabin: s.cabin_class,
                            available: !taken.contains(&s.id),
                        })
                        .collect(),
                }
            })
            .collect();

        let seats_per_row = rows_result.iter().map(|r| r.seats.len() as i32).max().unwrap_or(0);

        Self {
            rows: rows_result.len() as i32,
            seats_per_row,
            rows_result,
        }
    }

    /// Generated layout for flights without one: six abreast, First up front,
    /// Business behind it, the booked passengers filled in from the rear.
    pub fn heuristic(total_seats: i32, booked_passengers: i32) -> Self {
        let total = total_seats.max(0);
        let per_row = HEURISTIC_COLUMNS.len() as i32;
        let rows = (total + per_row - 1) / per_row;
        let first_rows = (rows / 10).max(1);
        let business_rows = (rows / 5).max(1);

        let mut entries = Vec::with_capacity(total as usize);
        for row in 1..=rows {
            let cabin = if row <= first_rows {
                FareClass::First
            } else if row <= first_rows + business_rows {
                FareClass::Business
            } else {
                FareClass::Economy
            };
            for col in HEURISTIC_COLUMNS {
                if entries.len() as i32 >= total {
                    break;
                }
                entries.push(SeatMapEntry {
                    id: None,
                    label: format!("{}{}", row, col),
                    column: col.to_string(),
                    row,
                    cabin,
                    available: true,
                });
            }
        }

        let occupied = booked_passengers.clamp(0, total) as usize;
        let len = entries.len();
        for entry in entries.iter_mut().skip(len - occupied) {
            entry.available = false;
        }

        let mut rows_result: Vec<SeatRow> = Vec::with_capacity(rows as usize);
        for entry in entries {
            match rows_result.last_mut() {
                Some(last) if last.row == entry.row => last.seats.push(entry),
                _ => rows_result.push(SeatRow {
                    row: entry.row,
                    seats: vec![entry],
                }),
            }
        }

        Self {
            rows,
            seats_per_row: per_row,
            rows_result,
        }
    }

    pub fn available_count(&self) -> usize {
        self.rows_result
            .iter()
            .flat_map(|r| r.seats.iter())
            .filter(|s| s.available)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_layout() {
        let map = SeatMap::heuristic(62, 5);
        assert_eq!(map.rows, 11);
        assert_eq!(map.seats_per_row, 6);
        assert_eq!(map.rows_result.len(), 11);
        // last row holds the two leftover seats
        assert_eq!(map.rows_result[10].seats.len(), 2);

        // 11 rows -> 1 First row, 2 Business rows
        assert_eq!(map.rows_result[0].seats[0].cabin, FareClass::First);
        assert_eq!(map.rows_result[1].seats[0].cabin, FareClass::Business);
        assert_eq!(map.rows_result[2].seats[0].cabin, FareClass::Business);
        assert_eq!(map.rows_result[3].seats[0].cabin, FareClass::Economy);

        assert_eq!(map.available_count(), 57);
        assert!(!map.rows_result[10].seats[1].available);
        assert!(map.rows_result[0].seats[0].available);
    }

    #[test]
    fn test_heuristic_overbooked_marks_everything() {
        let map = SeatMap::heuristic(12, 40);
        assert_eq!(map.available_count(), 0);
    }

    #[test]
    fn test_layout_map_flags_taken_seats() {
        let layout = Uuid::new_v4();
        let mk = |row: i32, col: &str| Seat {
            id: Uuid::new_v4(),
            seat_layout_id: layout,
            row_number: row,
            column: col.to_string(),
            label: format!("{}{}", row, col),
            cabin_class: FareClass::Economy,
            is_exit_row: false,
            is_premium: false,
            price_modifier_cents: None,
        };
        let seats = vec![mk(2, "B"), mk(1, "A"), mk(2, "A")];
        let mut taken = HashSet::new();
        taken.insert(seats[0].id);

        let map = SeatMap::from_layout(&seats, &taken);
        assert_eq!(map.rows, 2);
        assert_eq!(map.seats_per_row, 2);
        assert_eq!(map.rows_result[1].seats[0].label, "2A");
        assert!(!map.rows_result[1].seats[1].available);
        assert_eq!(map.available_count(), 2);
    }
}
