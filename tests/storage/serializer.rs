use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasksync::storage::{LocalStorage, StoreSerializer};
use tokio::time::Instant;

const SETTLE: Duration = Duration::from_millis(40);

#[tokio::test]
async fn test_waiters_are_served_in_arrival_order() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let serializer = Arc::new(StoreSerializer::new(storage, SETTLE));
    let served = Arc::new(Mutex::new(Vec::new()));

    let gate = serializer.acquire().await;
    let mut waiters = Vec::new();
    for i in 0..3 {
        let serializer = serializer.clone();
        let served = served.clone();
        waiters.push(tokio::spawn(async move {
            let _guard = serializer.acquire().await;
            served.lock().unwrap().push((i, Instant::now()));
        }));
        // Let this waiter queue up before the next one arrives
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let released = Instant::now();
    drop(gate);
    for waiter in waiters {
        waiter.await.unwrap();
    }

    let served = served.lock().unwrap().clone();
    let order: Vec<i32> = served.iter().map(|(i, _)| *i).collect();
    assert_eq!(order, vec![0, 1, 2]);

    // Every holder waits out the settling delay of the one before it
    assert!(served[0].1.duration_since(released) >= SETTLE);
    for pair in served.windows(2) {
        assert!(pair[1].1.duration_since(pair[0].1) >= SETTLE);
    }
}

#[tokio::test]
async fn test_first_acquire_does_not_wait() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let serializer = StoreSerializer::new(storage, Duration::from_secs(5));

    let started = Instant::now();
    drop(serializer.acquire().await);
    assert!(started.elapsed() < Duration::from_secs(1));
}
