//! Map-backed repositories for handler tests.

use super::{FollowUpRepo, RoomRepo, ShiftRepo, StoreError};
use crate::models::{FollowUp, Room, Shift};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryRoomRepo {
    pub rooms: Mutex<BTreeMap<String, Room>>,
}

#[async_trait]
impl RoomRepo for MemoryRoomRepo {
    async fn create(&self, room: &Room) -> Result<(), StoreError> {
        self.rooms
            .lock()
            .unwrap()
            .entry(room.id.clone())
            .or_insert_with(|| room.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryShiftRepo {
    pub shifts: Mutex<BTreeMap<i64, Shift>>,
}

impl MemoryShiftRepo {
    pub fn all(&self) -> Vec<Shift> {
        self.shifts.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ShiftRepo for MemoryShiftRepo {
    async fn create(&self, shifts: &[Shift]) -> Result<Vec<i64>, StoreError> {
        let mut map = self.shifts.lock().unwrap();
        for shift in shifts {
            let conflict = map
                .values()
                .any(|s| s.room_id == shift.room_id && s.holder == shift.holder && s.is_active());
            if conflict {
                return Err(StoreError::ActiveShiftConflict {
                    room_id: shift.room_id.clone(),
                    holder: shift.holder.clone(),
                });
            }
        }

        let mut ids = Vec::with_capacity(shifts.len());
        for shift in shifts {
            let id = map.keys().next_back().copied().unwrap_or(0) + 1;
            map.insert(id, Shift { id, ..shift.clone() });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get(&self, room_id: &str) -> Result<Vec<Shift>, StoreError> {
        let mut shifts: Vec<Shift> = self
            .all()
            .into_iter()
            .filter(|s| s.room_id == room_id)
            .collect();
        shifts.sort_by_key(|s| (s.start_time, s.id));
        Ok(shifts)
    }

    async fn active(&self, room_id: &str) -> Result<Vec<Shift>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| s.room_id == room_id && s.is_active())
            .collect())
    }

    async fn end(&self, room_id: &str, shift_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut map = self.shifts.lock().unwrap();
        let target_active = map
            .get(&shift_id)
            .is_some_and(|s| s.room_id == room_id && s.is_active());
        if !target_active {
            return Ok(0);
        }

        let mut changed = 0;
        for shift in map.values_mut() {
            if shift.room_id == room_id && shift.is_active() {
                shift.end_time = Some(at.timestamp());
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn report(
        &self,
        room_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Shift>, StoreError> {
        Ok(self
            .get(room_id)
            .await?
            .into_iter()
            .filter(|s| {
                s.start_time <= to.timestamp()
                    && s.end_time.map_or(true, |end| end >= from.timestamp())
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryFollowUpRepo {
    pub items: Mutex<BTreeMap<i64, FollowUp>>,
}

impl MemoryFollowUpRepo {
    pub fn all(&self) -> Vec<FollowUp> {
        self.items.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl FollowUpRepo for MemoryFollowUpRepo {
    async fn create(&self, follow_up: &FollowUp) -> Result<i64, StoreError> {
        let mut map = self.items.lock().unwrap();
        let id = map.keys().next_back().copied().unwrap_or(0) + 1;
        map.insert(id, FollowUp { id, ..follow_up.clone() });
        Ok(id)
    }

    async fn get(&self, shift_id: i64) -> Result<Vec<FollowUp>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|f| f.shift_id == shift_id)
            .collect())
    }

    async fn resolve(&self, id: i64) -> Result<u64, StoreError> {
        match self.items.lock().unwrap().get_mut(&id) {
            Some(item) => {
                item.done = true;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
