use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use skyseat_core::{Flight, FlightService, Gate, GateStats, SeatMap};

const SEATS: [&str; 6] = ["A1", "A2", "A3", "B1", "B2", "B3"];

fn vuelo_123() -> FlightService {
    let mut seat_map = SeatMap::new();
    seat_map
        .insert_flight(Flight::new("vuelo_123", SEATS).unwrap())
        .unwrap();
    FlightService::new(seat_map)
}

fn wait_until<T>(gate: &Gate<T>, check: impl Fn(GateStats) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check(gate.stats()) {
        assert!(Instant::now() < deadline, "gate stuck at {:?}", gate.stats());
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_single_flight_booking_scenario() {
    let service = vuelo_123();

    assert_eq!(service.reserve("vuelo_123", "A1", "Alice"), Ok(true));
    assert_eq!(service.query_all().unwrap().occupant("vuelo_123", "A1"), Some("Alice"));

    assert_eq!(service.reserve("vuelo_123", "A1", "Bob"), Ok(false));
    assert_eq!(service.query_all().unwrap().occupant("vuelo_123", "A1"), Some("Alice"));

    assert_eq!(service.cancel("vuelo_123", "A1"), Ok(true));
    assert_eq!(service.query_all().unwrap().occupant("vuelo_123", "A1"), None);

    assert_eq!(service.cancel("vuelo_123", "A1"), Ok(false));

    service.reserve("vuelo_123", "B2", "Carol").unwrap();
    service.reset_all().unwrap();
    let snapshot = service.query_all().unwrap();
    let flight = snapshot.flight("vuelo_123").unwrap();
    assert_eq!(flight.len(), 6);
    assert!(flight.seats().all(|(_, occupant)| occupant.is_none()));
}

#[test]
fn test_writer_waiting_on_reader_goes_before_later_reader() {
    let gate = Arc::new(Gate::new(()));
    let order = Arc::new(Mutex::new(Vec::new()));

    // R holds the gate while W and then R2 arrive.
    let r = gate.enter_read();

    let w = {
        let (gate, order) = (Arc::clone(&gate), Arc::clone(&order));
        thread::spawn(move || {
            let _guard = gate.enter_write();
            order.lock().unwrap().push("W");
        })
    };
    wait_until(&gate, |s| s.waiting_writers == 1);

    let r2 = {
        let (gate, order) = (Arc::clone(&gate), Arc::clone(&order));
        thread::spawn(move || {
            let _guard = gate.enter_read();
            order.lock().unwrap().push("R2");
        })
    };
    wait_until(&gate, |s| s.waiting_readers == 1);

    order.lock().unwrap().push("R");
    drop(r);
    w.join().unwrap();
    r2.join().unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["R", "W", "R2"]);
}

#[test]
fn test_concurrent_reservations_of_one_seat_have_one_winner() {
    let service = Arc::new(vuelo_123());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .reserve("vuelo_123", "A3", &format!("passenger-{i}"))
                    .unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!(service
        .query_all()
        .unwrap()
        .occupant("vuelo_123", "A3")
        .unwrap()
        .starts_with("passenger-"));
}

#[test]
fn test_every_seat_is_sold_exactly_once_under_contention() {
    let service = Arc::new(vuelo_123());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                SEATS
                    .iter()
                    .filter(|seat| {
                        service
                            .reserve("vuelo_123", seat, &format!("agent-{i}"))
                            .unwrap()
                    })
                    .count()
            })
        })
        .collect();

    let sold: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(sold, SEATS.len());
    assert_eq!(service.query_all().unwrap().occupied_count(), SEATS.len());
}

#[test]
fn test_readers_never_observe_a_write_in_progress() {
    // Two halves that every writer keeps equal; a torn read would see them differ.
    let gate = Arc::new(Gate::new((0u64, 0u64)));
    let writers_inside = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let (gate, inside) = (Arc::clone(&gate), Arc::clone(&writers_inside));
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut pair = gate.enter_write();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    pair.0 += 1;
                    thread::yield_now();
                    pair.1 += 1;
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let (gate, inside) = (Arc::clone(&gate), Arc::clone(&writers_inside));
            thread::spawn(move || {
                for _ in 0..200 {
                    let pair = gate.enter_read();
                    assert_eq!(inside.load(Ordering::SeqCst), 0);
                    assert_eq!(pair.0, pair.1);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(*gate.enter_read(), (800, 800));
    assert_eq!(gate.stats(), GateStats::default());
}

#[test]
fn test_snapshots_stay_consistent_while_writers_run() {
    let service = Arc::new(vuelo_123());
    let writer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for round in 0..100 {
                for seat in SEATS {
                    service
                        .reserve("vuelo_123", seat, &format!("round-{round}"))
                        .unwrap();
                }
                service.reset_all().unwrap();
            }
        })
    };

    for _ in 0..200 {
        let snapshot = service.query_all().unwrap();
        let flight = snapshot.flight("vuelo_123").unwrap();
        // Seats fill in order within a round, so a snapshot must show a prefix
        // of one round's names.
        let occupants: Vec<_> = SEATS.iter().map(|seat| flight.occupant(seat)).collect();
        let filled = occupants.iter().take_while(|o| o.is_some()).count();
        assert!(occupants[filled..].iter().all(Option::is_none));
        if let Some(Some(first)) = occupants.first() {
            assert!(occupants[..filled].iter().all(|o| *o == Some(*first)));
        }
    }

    writer.join().unwrap();
    assert_eq!(service.query_all().unwrap().occupied_count(), 0);
}
