//! XP to level conversion.
//!
//! Advancing from level `L` to `L + 1` costs `floor(100 * L^1.5)` XP, so the
//! first level-up needs 100 XP, the second 282, the third 519 and so on.

use crate::models::LevelProgress;

/// XP needed to go from `level` to `level + 1`.
pub fn xp_to_advance_from(level: u32) -> i64 {
    if level == 0 {
        return 0;
    }
    (100.0 * f64::from(level).powf(1.5)).floor() as i64
}

/// Cumulative XP needed to reach `level` starting from level 1 with 0 XP.
pub fn total_xp_for_level(level: u32) -> i64 {
    (1..level).map(xp_to_advance_from).sum()
}

pub fn level_progress(total_xp: i64) -> LevelProgress {
    let total_xp = total_xp.max(0);

    let mut level = 1u32;
    let mut total_for_current = 0i64;
    loop {
        let cost = xp_to_advance_from(level);
        let total_for_next = total_for_current.saturating_add(cost);

        // Saturation only happens near i64::MAX; stop there rather than spin.
        if total_xp < total_for_next || total_for_next == i64::MAX {
            let xp_into_level = total_xp - total_for_current;
            let progress_percentage = if cost > 0 {
                (xp_into_level as f64 / cost as f64 * 100.0).clamp(0.0, 100.0)
            } else {
                100.0
            };

            return LevelProgress {
                level,
                xp_into_level,
                xp_for_next_level: cost,
                progress_percentage,
                total_xp_for_current_level: total_for_current,
                total_xp_for_next_level: total_for_next,
            };
        }

        level += 1;
        total_for_current = total_for_next;
    }
}
