//! Property test: seat counters always match the live bookings.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use airline_booking_core::types::{FareClassRequest, FareClassTag, Money};
use airline_booking_core::BookingError;
use airline_booking_testing::{fixtures, properties};
use common::{create_flight, customer, engine};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Step {
    Book { seats: usize, class: FareClassTag },
    CancelOldest,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1usize..=4, properties::fare_class_tag())
            .prop_map(|(seats, class)| Step::Book { seats, class }),
        1 => Just(Step::CancelOldest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn seat_counters_match_live_bookings(steps in prop::collection::vec(step(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let storage = fixtures::seeded_storage();
            let engine = engine(&storage);

            let mut request = fixtures::reference_request();
            request.fare_classes[0].seat_count = 10;
            request.fare_classes.push(FareClassRequest {
                tag: FareClassTag::Business,
                seat_count: 3,
                price: Money::from_cents(60_000),
            });
            let flight = create_flight(&engine, &request).await;

            for step in steps {
                match step {
                    Step::Book { seats, class } => {
                        let result = engine
                            .bookings
                            .book_flight(&customer(), flight.id, &fixtures::passengers(seats, class))
                            .await;
                        if let Err(error) = result {
                            assert!(
                                matches!(error, BookingError::InsufficientInventory { .. }),
                                "unexpected error: {error}"
                            );
                        }
                    }
                    Step::CancelOldest => {
                        let mine = engine.bookings.my_bookings(&customer()).await.unwrap();
                        if let Some(oldest) = mine.first() {
                            engine.bookings.delete_booking(oldest.booking.id).await.unwrap();
                        }
                    }
                }

                let live = storage.bookings().unwrap();
                for class in storage.fare_classes().unwrap() {
                    assert!(class.is_consistent(), "{class:?}");
                    let booked: u32 = live
                        .iter()
                        .flat_map(|b| &b.passengers)
                        .filter(|p| p.fare_class == class.tag)
                        .count()
                        .try_into()
                        .unwrap();
                    assert_eq!(class.seat_count - class.available_seats, booked);
                }
            }
        });
    }
}
