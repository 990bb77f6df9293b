use std::collections::BTreeSet;

use shared_models::time::TimeOfDay;

use crate::models::AvailabilityBlock;

/// Start times of the slots that fit entirely inside `[start, end)`, stepping
/// by `slot_duration`. A trailing partial slot is dropped.
pub fn block_slots(
    start: TimeOfDay,
    end: TimeOfDay,
    slot_duration: u32,
) -> impl Iterator<Item = TimeOfDay> {
    let end_minutes = end.minutes();
    let first = (slot_duration > 0).then(|| start.minutes());

    std::iter::successors(first, move |current| current.checked_add(slot_duration))
        .take_while(move |current| current + slot_duration <= end_minutes)
        .filter_map(TimeOfDay::from_minutes)
}

/// Merge the slots of every active block into one ordered, duplicate-free list.
pub fn collect_slots<'a, I>(blocks: I) -> Vec<TimeOfDay>
where
    I: IntoIterator<Item = &'a AvailabilityBlock>,
{
    blocks
        .into_iter()
        .filter(|block| block.is_active)
        .flat_map(|block| block_slots(block.start_time, block.end_time, block.slot_duration))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;

    fn t(raw: &str) -> TimeOfDay {
        raw.parse().unwrap()
    }

    fn block(start: &str, end: &str, slot_duration: u32) -> AvailabilityBlock {
        AvailabilityBlock {
            id: 1,
            nutritionist_id: 1,
            day_of_week: DayOfWeek::Monday,
            start_time: t(start),
            end_time: t(end),
            slot_duration,
            is_active: true,
            created_at: None,
        }
    }

    fn render(slots: impl IntoIterator<Item = TimeOfDay>) -> Vec<String> {
        slots.into_iter().map(|slot| slot.to_string()).collect()
    }

    #[test]
    fn half_hour_slots_exclude_block_end() {
        let slots = block_slots(t("09:00"), t("10:00"), 30);
        assert_eq!(render(slots), vec!["09:00", "09:30"]);
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        let slots = block_slots(t("09:00"), t("10:40"), 45);
        assert_eq!(render(slots), vec!["09:00", "09:45"]);
    }

    #[test]
    fn slot_longer_than_block_yields_nothing() {
        assert_eq!(block_slots(t("09:00"), t("09:30"), 60).count(), 0);
    }

    #[test]
    fn zero_duration_yields_nothing() {
        assert_eq!(block_slots(t("09:00"), t("17:00"), 0).count(), 0);
    }

    #[test]
    fn slots_run_up_to_late_evening() {
        let slots = render(block_slots(t("22:00"), t("23:59"), 15));
        assert_eq!(slots.first().map(String::as_str), Some("22:00"));
        assert_eq!(slots.last().map(String::as_str), Some("23:30"));
        assert_eq!(slots.len(), 7);
    }

    #[test]
    fn block_ending_at_midnight_fills_the_last_hour() {
        let slots = block_slots(t("23:00"), t("24:00"), 30);
        assert_eq!(render(slots), vec!["23:00", "23:30"]);
    }

    #[test]
    fn output_is_zero_padded() {
        for slot in render(block_slots(t("00:00"), t("12:00"), 15)) {
            assert_eq!(slot.len(), 5);
            assert_eq!(&slot[2..3], ":");
        }
    }

    #[test]
    fn blocks_are_merged_sorted_and_deduplicated() {
        let blocks = vec![
            block("14:00", "16:00", 60),
            block("09:00", "11:00", 60),
            block("10:00", "12:00", 60),
        ];
        assert_eq!(
            render(collect_slots(&blocks)),
            vec!["09:00", "10:00", "11:00", "14:00", "15:00"]
        );
    }

    #[test]
    fn inactive_blocks_contribute_nothing() {
        let mut retired = block("09:00", "11:00", 60);
        retired.is_active = false;
        assert!(collect_slots(&[retired]).is_empty());
    }

    #[test]
    fn no_blocks_means_no_slots() {
        assert!(collect_slots(&Vec::<AvailabilityBlock>::new()).is_empty());
    }
}
