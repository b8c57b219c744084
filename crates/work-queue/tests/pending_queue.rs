use std::sync::Arc;
use std::thread;
use uuid::Uuid;
use work_queue::{InMemoryPendingQueue, PendingQueue};

#[test]
fn duplicates_are_kept_and_popped_twice() {
  let q = InMemoryPendingQueue::new();
  let id = Uuid::new_v4();
  q.enqueue(id).unwrap();
  q.enqueue(id).unwrap();
  assert_eq!(q.len().unwrap(), 2);
  assert_eq!(q.dequeue_one().unwrap(), Some(id));
  assert_eq!(q.dequeue_one().unwrap(), Some(id));
  assert_eq!(q.dequeue_one().unwrap(), None);
}

#[test]
fn remove_takes_one_occurrence_and_purge_takes_all() {
  let q = InMemoryPendingQueue::new();
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  for id in [a, b, a, a] {
    q.enqueue(id).unwrap();
  }
  assert!(q.remove(a).unwrap());
  assert_eq!(q.len().unwrap(), 3);
  assert_eq!(q.purge(a).unwrap(), 2);
  assert_eq!(q.peek(10).unwrap(), vec![b]);
  assert!(!q.remove(a).unwrap());
  assert!(!q.contains(a).unwrap());
  assert!(q.contains(b).unwrap());
}

#[test]
fn memory_queue_is_not_durable() {
  assert!(!InMemoryPendingQueue::new().is_durable());
}

#[test]
fn peek_is_non_destructive_and_bounded() {
  let q = InMemoryPendingQueue::new();
  let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
  for id in &ids {
    q.enqueue(*id).unwrap();
  }
  assert_eq!(q.peek(3).unwrap(), ids[..3].to_vec());
  assert!(q.peek(0).unwrap().is_empty());
  assert_eq!(q.len().unwrap(), 5);
}

#[test]
fn concurrent_pops_never_hand_out_the_same_entry() {
  let q = Arc::new(InMemoryPendingQueue::new());
  for _ in 0..200 {
    q.enqueue(Uuid::new_v4()).unwrap();
  }
  let handles: Vec<_> = (0..4).map(|_| {
                                let q = q.clone();
                                thread::spawn(move || {
                                  let mut got = Vec::new();
                                  while let Some(id) = q.dequeue_one().unwrap() {
                                    got.push(id);
                                  }
                                  got
                                })
                              })
                              .collect();
  let mut all: Vec<Uuid> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
  assert_eq!(all.len(), 200);
  all.sort();
  all.dedup();
  assert_eq!(all.len(), 200);
  assert!(q.is_empty().unwrap());
}
