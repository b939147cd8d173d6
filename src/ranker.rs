/*
 * This file is part of Chairman.
 *
 * Copyright (C) 2025 Chairman contributors
 *
 * Chairman is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Chairman is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Chairman. If not, see <https://www.gnu.org/licenses/>.
 */

//! Sensor ranking
//!
//! The reading buffer is ordered with an in-place heap sort and the hottest
//! present value is taken from the top end. Unfilled and invalid slots are
//! `None`, which orders below every reading, so they can never be selected.
//! The result is the same as taking the maximum of all positive readings.

use crate::readings::Reading;

/// Sort `keys` ascending in place.
///
/// The heap uses 1-based positions: the parent of `n` is `n / 2` and its
/// children are `2n` and `2n + 1`. Position `n` lives at `keys[n - 1]`.
pub fn heap_sort<T: Ord>(keys: &mut [T]) {
    let len = keys.len();
    if len < 2 {
        return;
    }

    // Build a max-heap by sifting each new element up.
    for last in 2..=len {
        let mut n = last;
        while n > 1 {
            let parent = n / 2;
            if keys[parent - 1] > keys[n - 1] {
                break;
            }
            keys.swap(parent - 1, n - 1);
            n = parent;
        }
    }

    // Move the root behind the shrinking heap, then restore the heap.
    for last in (1..len).rev() {
        keys.swap(0, last);
        let mut n = 1;
        loop {
            let mut max = n;
            let left = n * 2;
            let right = left + 1;

            if left <= last && keys[left - 1] > keys[max - 1] {
                max = left;
            }
            if right <= last && keys[right - 1] > keys[max - 1] {
                max = right;
            }
            if max == n {
                break;
            }
            keys.swap(max - 1, n - 1);
            n = max;
        }
    }
}

/// Sort the full slot array and return the largest present reading
pub fn select_highest(slots: &mut [Option<Reading>]) -> Option<Reading> {
    heap_sort(slots);
    slots.iter().rev().find_map(|slot| *slot)
}
