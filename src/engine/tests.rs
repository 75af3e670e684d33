use super::*;

use chrono::{Datelike, TimeZone, Utc};

use crate::model::*;

// 2026-10-19 is the Monday of ISO week 43 (week1 of the rotation).
// Default schedule: batch1 Mon-Wed, batch2 Thu-Fri in week1.

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn utc(y: i32, m: u32, day: u32, h: u32, min: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, day, h, min, 0).unwrap()
}

fn tue() -> NaiveDate {
    d(2026, 10, 20)
}

fn thu() -> NaiveDate {
    d(2026, 10, 22)
}

/// Six seats: 1-4 designated, 5-6 floaters. Seat 1 belongs to ana (batch1).
/// ben is batch2, cy is batch1. The clock reads Monday 16:00 UTC.
async fn setup() -> (Arc<Engine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(utc(2026, 10, 19, 16, 0)));
    let config = EngineConfig {
        seat_count: 6,
        floater_seats: 2,
        ..EngineConfig::default()
    };
    let engine = Arc::new(Engine::new(config, clock.clone(), Arc::new(NotifyHub::new())));
    engine.register_user("ana", Batch::Batch1, false).unwrap();
    engine.register_user("ben", Batch::Batch2, false).unwrap();
    engine.register_user("cy", Batch::Batch1, false).unwrap();
    engine.register_user("root", Batch::Batch1, true).unwrap();
    engine.assign_designated_seat("ana", 1).await.unwrap();
    (engine, clock)
}

fn status(state: &SeatState, seat_id: SeatId) -> SeatStatus {
    state.seats.iter().find(|s| s.seat_id == seat_id).unwrap().status
}

// ── Projection ───────────────────────────────────────────

#[tokio::test]
async fn engine_every_seat_has_one_status() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    engine.acquire_locks("cy", tue(), &[6]).await.unwrap();

    let state = engine.seat_state("ana", tue()).await.unwrap();
    assert_eq!(state.seats.len(), 6);
    assert_eq!(status(&state, 5), SeatStatus::Occupied);
    assert_eq!(status(&state, 6), SeatStatus::Locked);
    for seat in [1, 2, 3, 4] {
        assert_eq!(status(&state, seat), SeatStatus::Available);
    }
    assert!(state.seats[0].is_my_designated);
}

#[tokio::test]
async fn engine_seat_state_unknown_user() {
    let (engine, _clock) = setup().await;
    let result = engine.seat_state("ghost", tue()).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

// ── Locks ────────────────────────────────────────────────

#[tokio::test]
async fn engine_lock_conflict_with_other_user() {
    let (engine, _clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();

    let result = engine.acquire_locks("cy", tue(), &[6, 5]).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));

    // whole batch rejected: seat 6 was not locked either
    let state = engine.seat_state("cy", tue()).await.unwrap();
    assert_eq!(status(&state, 6), SeatStatus::Available);
}

#[tokio::test]
async fn engine_relock_refreshes_expiry() {
    let (engine, clock) = setup().await;
    let first = engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    clock.advance(Duration::seconds(90));
    let second = engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    assert_eq!(second[0].expires_at - first[0].expires_at, Duration::seconds(90));

    let rs = engine.store().day(&tue()).unwrap();
    let day = rs.read().await;
    assert_eq!(day.live_locks(engine.now()).count(), 1);
}

#[tokio::test]
async fn engine_lock_on_booked_seat_conflicts() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    let result = engine.acquire_locks("ben", tue(), &[5]).await;
    assert_eq!(result.unwrap_err(), EngineError::Conflict("seat 5 is already booked".into()));
}

#[tokio::test]
async fn engine_expired_lock_is_inert() {
    let (engine, clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();

    clock.advance(Duration::seconds(LOCK_TTL_SECS));
    let state = engine.seat_state("cy", tue()).await.unwrap();
    assert_eq!(status(&state, 5), SeatStatus::Available);

    engine.acquire_locks("cy", tue(), &[5]).await.unwrap();
    engine.confirm_booking("cy", tue(), &[5]).await.unwrap();
    let state = engine.seat_state("ben", tue()).await.unwrap();
    assert_eq!(status(&state, 5), SeatStatus::Occupied);
}

#[tokio::test]
async fn engine_expired_lock_does_not_block_confirm() {
    let (engine, clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[6]).await.unwrap();
    clock.advance(Duration::seconds(LOCK_TTL_SECS + 1));
    engine.confirm_booking("cy", tue(), &[6]).await.unwrap();
}

#[tokio::test]
async fn engine_release_only_own_locks() {
    let (engine, _clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    engine.acquire_locks("cy", tue(), &[6]).await.unwrap();

    let released = engine.release_locks("ben", tue(), &[5, 6]).await.unwrap();
    assert_eq!(released, vec![5]);

    let state = engine.seat_state("ben", tue()).await.unwrap();
    assert_eq!(status(&state, 5), SeatStatus::Available);
    assert_eq!(status(&state, 6), SeatStatus::Locked);

    // nothing held: no-op
    let released = engine.release_locks("ben", d(2026, 10, 21), &[5]).await.unwrap();
    assert!(released.is_empty());
}

#[tokio::test]
async fn engine_lock_ignores_advance_window() {
    let (engine, clock) = setup().await;
    clock.set(utc(2026, 10, 19, 10, 0));
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
}

// ── Confirm ──────────────────────────────────────────────

#[tokio::test]
async fn engine_confirm_is_all_or_nothing() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[6]).await.unwrap();

    let result = engine.confirm_booking("cy", tue(), &[5, 6]).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));

    let all = engine.list_all_bookings().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].user_id, "ben");
    assert!(engine.list_user_bookings("cy").await.unwrap().is_empty());
}

#[tokio::test]
async fn engine_confirm_blocked_by_live_foreign_lock() {
    let (engine, _clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    let result = engine.confirm_booking("cy", tue(), &[5]).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn engine_confirm_consumes_own_lock() {
    let (engine, _clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5, 6]).await.unwrap();
    let booked = engine.confirm_booking("ben", tue(), &[5, 6]).await.unwrap();
    assert_eq!(booked.len(), 2);
    assert_eq!(booked[0].booked_at, engine.now());

    let rs = engine.store().day(&tue()).unwrap();
    let day = rs.read().await;
    assert!(day.lock(5).is_none());
    assert!(day.lock(6).is_none());
}

#[tokio::test]
async fn engine_confirm_seat_limit() {
    let (engine, _clock) = setup().await;
    let result = engine.confirm_booking("ana", tue(), &[1, 2, 3, 4, 5, 6]).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(engine.list_all_bookings().await.is_empty());

    engine.confirm_booking("ana", tue(), &[1, 2, 3, 4, 5]).await.unwrap();
}

#[tokio::test]
async fn engine_confirm_dedupes_seats() {
    let (engine, _clock) = setup().await;
    let booked = engine.confirm_booking("ben", tue(), &[5, 5]).await.unwrap();
    assert_eq!(booked.len(), 1);
}

#[tokio::test]
async fn engine_seat_limit_counts_repeated_ids() {
    let (engine, _clock) = setup().await;
    let result = engine.confirm_booking("ben", tue(), &[5, 5, 5, 5, 5, 5]).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(engine.list_all_bookings().await.is_empty());
}

#[tokio::test]
async fn engine_advance_window_boundary() {
    let (engine, clock) = setup().await;

    clock.set(utc(2026, 10, 19, 14, 59));
    let result = engine.confirm_booking("ben", tue(), &[5]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));

    clock.set(utc(2026, 10, 19, 15, 0));
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
}

#[tokio::test]
async fn engine_advance_window_uses_office_offset() {
    let clock = Arc::new(ManualClock::new(utc(2026, 10, 19, 13, 0)));
    let config = EngineConfig {
        seat_count: 2,
        floater_seats: 2,
        utc_offset: FixedOffset::east_opt(2 * 3600).unwrap(),
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, clock.clone(), Arc::new(NotifyHub::new()));
    engine.register_user("ben", Batch::Batch2, false).unwrap();

    // 13:00 UTC is 15:00 in the office
    engine.confirm_booking("ben", tue(), &[1]).await.unwrap();
    clock.set(utc(2026, 10, 19, 12, 59));
    let result = engine.confirm_booking("ben", tue(), &[2]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));
}

#[tokio::test]
async fn engine_weekend_and_holiday() {
    let (engine, _clock) = setup().await;
    let saturday = d(2026, 10, 24);
    assert_eq!(saturday.weekday(), chrono::Weekday::Sat);
    let result = engine.acquire_locks("ben", saturday, &[5]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));

    assert!(engine.toggle_holiday(tue(), true).await);
    assert!(!engine.toggle_holiday(tue(), true).await);
    let result = engine.confirm_booking("ben", tue(), &[5]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));

    engine.toggle_holiday(tue(), false).await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
}

#[tokio::test]
async fn engine_unknown_seat_rejected() {
    let (engine, _clock) = setup().await;
    let result = engine.confirm_booking("ben", tue(), &[5, 42]).await;
    assert_eq!(result.unwrap_err(), EngineError::Validation("unknown seat 42".into()));
    let result = engine.acquire_locks("ben", tue(), &[]).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

// ── Designated seats ─────────────────────────────────────

#[tokio::test]
async fn engine_designated_seat_owner_only() {
    let (engine, _clock) = setup().await;
    let result = engine.confirm_booking("cy", tue(), &[1]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));
    engine.confirm_booking("ana", tue(), &[1]).await.unwrap();
}

#[tokio::test]
async fn engine_designated_seat_needs_batch_day() {
    let (engine, _clock) = setup().await;
    let result = engine.confirm_booking("ana", thu(), &[1]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));
    // floaters are still open to ana on thursday
    engine.confirm_booking("ana", thu(), &[5]).await.unwrap();
}

#[tokio::test]
async fn engine_owner_leave_opens_designated_seat() {
    let (engine, _clock) = setup().await;
    engine.mark_leave("ana", thu()).await.unwrap();

    let state = engine.seat_state("ben", thu()).await.unwrap();
    assert_eq!(state.seats[0].effective_type, SeatType::Floater);

    engine.acquire_locks("ben", thu(), &[1]).await.unwrap();
    engine.confirm_booking("ben", thu(), &[1]).await.unwrap();
}

#[tokio::test]
async fn engine_schedule_replacement_applies_immediately() {
    let (engine, _clock) = setup().await;
    let mut schedule = engine.batch_schedule().await;
    schedule.batch1.week1.push(chrono::Weekday::Thu);
    engine.replace_batch_schedule(schedule).await;
    engine.confirm_booking("ana", thu(), &[1]).await.unwrap();
}

// ── Cancel ───────────────────────────────────────────────

#[tokio::test]
async fn engine_cancel_foreign_booking_fails() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    engine.confirm_booking("cy", tue(), &[6]).await.unwrap();

    let result = engine.cancel_booking("cy", tue(), &[6, 5]).await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::Validation("seat 5 is not booked by you on 2026-10-20".into())
    );
    assert_eq!(engine.list_all_bookings().await.len(), 2);
}

#[tokio::test]
async fn engine_cancel_names_first_seat_in_request_order() {
    let (engine, _clock) = setup().await;
    let result = engine.cancel_booking("ben", tue(), &[4, 2]).await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::Validation("seat 4 is not booked by you on 2026-10-20".into())
    );

    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    let result = engine.cancel_booking("ben", tue(), &[5, 4, 2]).await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::Validation("seat 4 is not booked by you on 2026-10-20".into())
    );
}

#[tokio::test]
async fn engine_cancel_own_booking() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5, 6]).await.unwrap();
    let cancelled = engine.cancel_booking("ben", tue(), &[6]).await.unwrap();
    assert_eq!(cancelled, vec![6]);
    let left = engine.list_user_bookings("ben").await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].seat_id, 5);

    let result = engine.cancel_booking("ben", d(2026, 10, 21), &[5]).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

// ── Leave ────────────────────────────────────────────────

#[tokio::test]
async fn engine_mark_leave_is_idempotent() {
    let (engine, _clock) = setup().await;
    let first = engine.mark_leave("ana", tue()).await.unwrap();
    let second = engine.mark_leave("ana", tue()).await.unwrap();
    assert!(first.created);
    assert!(!second.created);

    assert_eq!(engine.list_leaves().await.len(), 1);
    assert_eq!(engine.list_leaves().await[0].seat_id, Some(1));
    assert_eq!(engine.store().user("ana").unwrap().floater_leave_count, 1);
}

#[tokio::test]
async fn engine_leave_without_designated_seat_keeps_counter() {
    let (engine, _clock) = setup().await;
    engine.mark_leave("ben", tue()).await.unwrap();
    assert_eq!(engine.store().user("ben").unwrap().floater_leave_count, 0);
}

#[tokio::test]
async fn engine_leave_cancels_bookings() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ana", tue(), &[1, 5]).await.unwrap();
    engine.acquire_locks("ana", tue(), &[6]).await.unwrap();

    let outcome = engine.mark_leave("ana", tue()).await.unwrap();
    assert_eq!(outcome.cancelled, vec![1, 5]);
    assert!(engine.list_user_bookings("ana").await.unwrap().is_empty());

    let state = engine.seat_state("ben", tue()).await.unwrap();
    assert_eq!(status(&state, 6), SeatStatus::Available);

    let result = engine.confirm_booking("ana", tue(), &[5]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));
}

// ── Attendance ───────────────────────────────────────────

#[tokio::test]
async fn engine_attendance_spans_the_cycle() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    engine.confirm_booking("ben", tue(), &[6]).await.unwrap();
    engine.confirm_booking("ben", thu(), &[5]).await.unwrap();

    // wednesday of the even week: same cycle
    let state = engine.seat_state("ben", d(2026, 10, 28)).await.unwrap();
    assert_eq!(state.policy.cycle_start, d(2026, 10, 19));
    assert_eq!(state.policy.cycle_end, d(2026, 11, 1));
    assert_eq!(state.policy.attended_days, 2);

    // next cycle starts from zero
    let state = engine.seat_state("ben", d(2026, 11, 2)).await.unwrap();
    assert_eq!(state.policy.attended_days, 0);
}

// ── Concurrency ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn engine_concurrent_confirms_single_winner() {
    let (engine, _clock) = setup().await;
    for seat in [2, 3, 4, 5, 6] {
        let a = engine.clone();
        let b = engine.clone();
        let first = tokio::spawn(async move { a.confirm_booking("ben", tue(), &[seat]).await });
        let second = tokio::spawn(async move { b.confirm_booking("cy", tue(), &[seat]).await });
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1, "seat {seat}");
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(EngineError::Conflict(_))));
    }
    assert_eq!(engine.list_all_bookings().await.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn engine_concurrent_locks_single_winner() {
    let (engine, _clock) = setup().await;
    let mut handles = Vec::new();
    for user in ["ben", "cy", "root"] {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.acquire_locks(user, tue(), &[5, 6]).await
        }));
    }
    let mut winners = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn engine_concurrent_assignments_leave_one_seat() {
    for _ in 0..20 {
        let (engine, _clock) = setup().await;
        let a = engine.clone();
        let b = engine.clone();
        let first = tokio::spawn(async move { a.assign_designated_seat("ben", 2).await });
        let second = tokio::spawn(async move { b.assign_designated_seat("ben", 3).await });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let owned: Vec<SeatId> = engine
            .seats()
            .await
            .into_iter()
            .filter(|s| s.owner.as_deref() == Some("ben"))
            .map(|s| s.seat_id)
            .collect();
        assert_eq!(owned.len(), 1, "ben owns {owned:?}");
        assert_eq!(engine.store().user("ben").unwrap().designated_seat, Some(owned[0]));
    }
}

// ── Admin ────────────────────────────────────────────────

#[tokio::test]
async fn engine_force_cancel() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    let removed = engine.force_cancel(tue(), 5).await.unwrap();
    assert_eq!(removed.user_id, "ben");
    assert!(matches!(engine.force_cancel(tue(), 5).await, Err(EngineError::NotFound(_))));
    assert!(matches!(
        engine.force_cancel(d(2026, 12, 1), 5).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn engine_assign_designated_seat_moves_owner() {
    let (engine, _clock) = setup().await;
    // ben takes ana's seat; ana loses her assignment
    engine.assign_designated_seat("ben", 1).await.unwrap();
    assert_eq!(engine.store().user("ana").unwrap().designated_seat, None);
    assert_eq!(engine.store().user("ben").unwrap().designated_seat, Some(1));

    // ben moves on to a floater seat, which becomes designated
    let seat = engine.assign_designated_seat("ben", 6).await.unwrap();
    assert_eq!(seat.seat_type, SeatType::Designated);
    let seats = engine.seats().await;
    assert_eq!(seats[0].owner, None);
    assert_eq!(seats[5].owner.as_deref(), Some("ben"));

    assert!(matches!(
        engine.assign_designated_seat("ghost", 2).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.assign_designated_seat("ben", 99).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn engine_floater_conversion_releases_owner() {
    let (engine, _clock) = setup().await;
    engine.set_seat_type(1, SeatType::Floater).await.unwrap();
    assert_eq!(engine.store().user("ana").unwrap().designated_seat, None);
    engine.confirm_booking("cy", tue(), &[1]).await.unwrap();
    assert!(matches!(
        engine.set_seat_type(77, SeatType::Floater).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn engine_reset_all() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ana", tue(), &[1]).await.unwrap();
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    engine.mark_leave("ana", thu()).await.unwrap();
    engine.toggle_holiday(d(2026, 12, 25), true).await;
    engine.set_seat_type(6, SeatType::Designated).await.unwrap();

    engine.reset_all().await;

    assert!(engine.list_all_bookings().await.is_empty());
    assert!(engine.list_leaves().await.is_empty());
    assert!(engine.holidays().await.is_empty());
    let ana = engine.store().user("ana").unwrap();
    assert_eq!(ana.designated_seat, None);
    assert_eq!(ana.floater_leave_count, 0);
    assert_eq!(engine.list_users().len(), 4);
    let seats = engine.seats().await;
    assert_eq!(seats[5].seat_type, SeatType::Floater);
    assert_eq!(seats[0].owner, None);
    let state = engine.seat_state("cy", tue()).await.unwrap();
    assert_eq!(status(&state, 5), SeatStatus::Available);
}

#[tokio::test]
async fn engine_register_rejects_duplicates_and_blank_ids() {
    let (engine, _clock) = setup().await;
    assert!(matches!(
        engine.register_user("ana", Batch::Batch2, false),
        Err(EngineError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.register_user("  ", Batch::Batch2, false),
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn engine_set_user_batch() {
    let (engine, _clock) = setup().await;
    engine.set_user_batch("ana", Batch::Batch2).unwrap();
    // ana is now batch2: tuesday of week1 is no longer her day
    let result = engine.confirm_booking("ana", tue(), &[1]).await;
    assert!(matches!(result, Err(EngineError::Policy(_))));
    engine.confirm_booking("ana", thu(), &[1]).await.unwrap();
}

// ── Reaper and change feed ───────────────────────────────

#[tokio::test]
async fn engine_reap_expired_locks() {
    let (engine, clock) = setup().await;
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    engine.acquire_locks("cy", thu(), &[6]).await.unwrap();
    assert_eq!(engine.reap_expired_locks().await, 0);

    clock.advance(Duration::seconds(LOCK_TTL_SECS));
    let mut rx = engine.notify.subscribe(tue());
    assert_eq!(engine.reap_expired_locks().await, 2);
    assert_eq!(
        rx.recv().await.unwrap(),
        SeatEvent::LocksReleased { date: tue(), user_id: "ben".into(), seat_ids: vec![5] }
    );

    // both dates held nothing but the expired locks
    assert!(engine.store().dates().is_empty());
}

#[tokio::test]
async fn engine_rejected_requests_leave_no_dates_behind() {
    let (engine, _clock) = setup().await;
    let saturday = d(2026, 10, 24);
    assert!(engine.acquire_locks("ben", saturday, &[5]).await.is_err());
    assert!(engine.confirm_booking("ben", saturday, &[5]).await.is_err());
    // ana's designated seat outside her batch days
    assert!(engine.acquire_locks("ana", thu(), &[1]).await.is_err());
    for offset in 0..60 {
        let date = tue() + Duration::days(offset);
        assert!(engine.acquire_locks("ben", date, &[42]).await.is_err());
        assert!(engine.confirm_booking("cy", date, &[42]).await.is_err());
    }
    assert!(engine.store().dates().is_empty());

    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    assert!(engine.acquire_locks("cy", tue(), &[5]).await.is_err());
    assert_eq!(engine.store().dates(), vec![tue()]);
}

#[tokio::test]
async fn engine_reaper_forgets_dates_emptied_by_cancel() {
    let (engine, _clock) = setup().await;
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();
    engine.confirm_booking("ben", thu(), &[5]).await.unwrap();
    engine.cancel_booking("ben", tue(), &[5]).await.unwrap();

    assert_eq!(engine.reap_expired_locks().await, 0);
    assert_eq!(engine.store().dates(), vec![thu()]);
}

#[tokio::test]
async fn engine_change_feed() {
    let (engine, _clock) = setup().await;
    let mut rx = engine.notify.subscribe(tue());
    engine.acquire_locks("ben", tue(), &[5]).await.unwrap();
    engine.confirm_booking("ben", tue(), &[5]).await.unwrap();

    assert!(matches!(rx.recv().await.unwrap(), SeatEvent::LocksAcquired { .. }));
    assert_eq!(
        rx.recv().await.unwrap(),
        SeatEvent::BookingsConfirmed { date: tue(), user_id: "ben".into(), seat_ids: vec![5] }
    );
}
