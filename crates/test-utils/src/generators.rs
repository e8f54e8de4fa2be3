//! Generators for synthetic GLM record hierarchies.
//!
//! Values follow simple formulas of the record index so tests can check
//! any decoded value without storing the expected table.

/// Event rows, one vector per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRows {
    pub id: Vec<i64>,
    pub time_offset: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub energy: Vec<f64>,
    pub parent_group_id: Vec<i64>,
}

/// Group rows, one vector per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRows {
    pub id: Vec<i64>,
    pub time_offset: Vec<f64>,
    pub frame_time_offset: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub area: Vec<f64>,
    pub energy: Vec<f64>,
    pub parent_flash_id: Vec<i64>,
    pub quality_flag: Vec<i64>,
}

/// Flash rows, one vector per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlashRows {
    pub id: Vec<i64>,
    pub time_offset_of_first_event: Vec<f64>,
    pub time_offset_of_last_event: Vec<f64>,
    pub frame_time_offset_of_first_event: Vec<f64>,
    pub frame_time_offset_of_last_event: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub area: Vec<f64>,
    pub energy: Vec<f64>,
    pub quality_flag: Vec<i64>,
}

/// A flash/group/event hierarchy in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    pub events: EventRows,
    pub groups: GroupRows,
    pub flashes: FlashRows,
}

/// First flash id. Ids are not record positions, so they start high.
pub const FIRST_FLASH_ID: i64 = 6_000;
/// First group id.
pub const FIRST_GROUP_ID: i64 = 467_100_000;
/// First event id.
pub const FIRST_EVENT_ID: i64 = 1_000_000_000;

/// Creates a consistent hierarchy where every parent id resolves.
///
/// Flash `f` has `groups_per_flash` groups and each group has
/// `events_per_group` events. Records are laid out flash by flash.
///
/// # Example
///
/// ```
/// use test_utils::generate_hierarchy;
///
/// let h = generate_hierarchy(2, 3, 4);
/// assert_eq!(h.flashes.id.len(), 2);
/// assert_eq!(h.groups.id.len(), 6);
/// assert_eq!(h.events.id.len(), 24);
/// assert_eq!(h.events.parent_group_id[4], h.groups.id[1]);
/// ```
pub fn generate_hierarchy(
    flashes: usize,
    groups_per_flash: usize,
    events_per_group: usize,
) -> Hierarchy {
    let mut h = Hierarchy::default();

    for f in 0..flashes {
        let flash_id = FIRST_FLASH_ID + f as i64;
        let flash_lat = 10.0 + f as f64 * 0.25;
        let flash_lon = -110.0 + f as f64 * 0.5;
        let first = -19.5 + f as f64 * 0.1;
        let last = first + 0.002 * (groups_per_flash.max(1) - 1) as f64;

        h.flashes.id.push(flash_id);
        h.flashes.time_offset_of_first_event.push(first);
        h.flashes.time_offset_of_last_event.push(last);
        h.flashes.frame_time_offset_of_first_event.push(first - 0.001);
        h.flashes.frame_time_offset_of_last_event.push(last - 0.001);
        h.flashes.lat.push(flash_lat);
        h.flashes.lon.push(flash_lon);
        h.flashes.area.push(80.0e6 * groups_per_flash as f64);
        h.flashes.energy.push(1.0e-14 * (f + 1) as f64);
        h.flashes.quality_flag.push(0);

        for g in 0..groups_per_flash {
            let group_index = f * groups_per_flash + g;
            let group_id = FIRST_GROUP_ID + group_index as i64;
            let group_time = first + 0.002 * g as f64;

            h.groups.id.push(group_id);
            h.groups.time_offset.push(group_time);
            h.groups.frame_time_offset.push(group_time - 0.001);
            h.groups.lat.push(flash_lat + g as f64 * 0.01);
            h.groups.lon.push(flash_lon - g as f64 * 0.01);
            h.groups.area.push(80.0e6);
            h.groups.energy.push(1.0e-15 * (group_index + 1) as f64);
            h.groups.parent_flash_id.push(flash_id);
            h.groups.quality_flag.push((group_index % 2) as i64);

            for e in 0..events_per_group {
                let event_index = group_index * events_per_group + e;
                h.events.id.push(FIRST_EVENT_ID + event_index as i64);
                h.events.time_offset.push(group_time);
                h.events.lat.push(flash_lat + g as f64 * 0.01 + e as f64 * 0.001);
                h.events.lon.push(flash_lon - g as f64 * 0.01 - e as f64 * 0.001);
                h.events.energy.push(1.0e-16 * (event_index + 1) as f64);
                h.events.parent_group_id.push(group_id);
            }
        }
    }

    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let h = generate_hierarchy(3, 2, 5);
        assert_eq!(h.flashes.id.len(), 3);
        assert_eq!(h.groups.id.len(), 6);
        assert_eq!(h.events.id.len(), 30);
        assert_eq!(h.groups.quality_flag.len(), 6);
    }

    #[test]
    fn test_every_parent_resolves() {
        let h = generate_hierarchy(4, 3, 2);
        for parent in &h.events.parent_group_id {
            assert!(h.groups.id.contains(parent));
        }
        for parent in &h.groups.parent_flash_id {
            assert!(h.flashes.id.contains(parent));
        }
    }

    #[test]
    fn test_empty_hierarchy() {
        let h = generate_hierarchy(0, 3, 3);
        assert!(h.events.id.is_empty());
        assert!(h.groups.id.is_empty());
    }
}
