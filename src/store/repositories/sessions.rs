use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use crate::models::{Lap, Session};
use crate::store::{load_collection, save_collection, KeyValueStore, SESSIONS_KEY};

/// Saved sessions, kept as one JSON array.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored order, which is save order.
    pub fn load_all(&self) -> Vec<Session> {
        load_collection(self.store.as_ref(), SESSIONS_KEY)
    }

    /// Appends `session`. Saved sessions are never rewritten, so an id that
    /// is already present is left as it was.
    pub fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.load_all();
        if sessions.iter().any(|s| s.id == session.id) {
            warn!("Session {} already saved; keeping stored copy", session.id);
            return Ok(());
        }

        sessions.push(session.clone());
        save_collection(self.store.as_ref(), SESSIONS_KEY, &sessions)?;
        info!(
            "Saved session {} ({} laps, {:.0} m)",
            session.id,
            session.laps.len(),
            session.total_distance_m
        );
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut sessions = self.load_all();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        save_collection(self.store.as_ref(), SESSIONS_KEY, &sessions)?;
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.load_all().into_iter().find(|s| s.id == id)
    }

    /// Most recent first.
    pub fn all_sessions(&self) -> Vec<Session> {
        let mut sessions = self.load_all();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    pub fn sessions_for_course(&self, course_id: &str) -> Vec<Session> {
        self.all_sessions()
            .into_iter()
            .filter(|s| s.course_id() == Some(course_id))
            .collect()
    }

    /// Fastest completed lap across every session run on `course_id`.
    /// Ties go to the earliest-stored lap.
    pub fn best_lap_for_course(&self, course_id: &str) -> Option<Lap> {
        self.load_all()
            .into_iter()
            .filter(|s| s.course_id() == Some(course_id))
            .flat_map(|s| s.laps.into_iter())
            .filter_map(|lap| lap.lap_time().map(|time| (time, lap)))
            .min_by_key(|(time, _)| *time)
            .map(|(_, lap)| lap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::models::Course;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, Utc};

    fn session_with_laps(course: &Course, started_at: DateTime<Utc>, lap_secs: &[i64]) -> Session {
        let mut session = Session::begin(Some(course), None, started_at);
        let mut at = started_at;
        for (i, secs) in lap_secs.iter().enumerate() {
            let mut lap = Lap::open(i as u32 + 1, at, Some(course.reference));
            at += Duration::seconds(*secs);
            lap.end_time = Some(at);
            session.laps.push(lap);
        }
        session.ended_at = Some(at);
        session
    }

    fn course(name: &str) -> Course {
        Course::new_custom(name, Coordinate::new(35.0, 135.0), 50.0, None, Utc::now())
    }

    #[test]
    fn save_appends_and_ignores_duplicates() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let c = course("A");
        let s = session_with_laps(&c, Utc::now(), &[60]);

        repo.save(&s).unwrap();
        let mut altered = s.clone();
        altered.total_distance_m = 9_999.0;
        repo.save(&altered).unwrap();

        let all = repo.load_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], s);
    }

    #[test]
    fn all_sessions_newest_first() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let c = course("A");
        let t0 = Utc::now();
        let old = session_with_laps(&c, t0 - Duration::days(2), &[60]);
        let new = session_with_laps(&c, t0, &[60]);
        repo.save(&old).unwrap();
        repo.save(&new).unwrap();

        let ids: Vec<_> = repo.all_sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[test]
    fn best_lap_is_scoped_to_course() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let a = course("A");
        let b = course("B");
        let t0 = Utc::now();
        repo.save(&session_with_laps(&a, t0, &[95, 91, 93])).unwrap();
        repo.save(&session_with_laps(&a, t0 + Duration::hours(1), &[92, 90])).unwrap();
        repo.save(&session_with_laps(&b, t0, &[30])).unwrap();

        let best = repo.best_lap_for_course(&a.id).unwrap();
        assert_eq!(best.lap_time(), Some(Duration::seconds(90)));
        assert_eq!(repo.sessions_for_course(&a.id).len(), 2);
        assert!(repo.best_lap_for_course("nope").is_none());
    }

    #[test]
    fn best_lap_ignores_open_laps() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let c = course("A");
        let mut session = Session::begin(Some(&c), None, Utc::now());
        session.laps.push(Lap::open(1, Utc::now(), None));
        repo.save(&session).unwrap();

        assert!(repo.best_lap_for_course(&c.id).is_none());
    }

    #[test]
    fn delete_removes_only_matching() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let c = course("A");
        let s1 = session_with_laps(&c, Utc::now(), &[60]);
        let s2 = session_with_laps(&c, Utc::now(), &[61]);
        repo.save(&s1).unwrap();
        repo.save(&s2).unwrap();

        assert!(repo.delete(&s1.id).unwrap());
        assert!(!repo.delete(&s1.id).unwrap());
        assert!(repo.get(&s1.id).is_none());
        assert_eq!(repo.get(&s2.id), Some(s2));
    }
}
