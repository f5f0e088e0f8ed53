// Lock-free history event channel

use crate::messaging::event::HistoryEvent;
use ringbuf::{HeapRb, traits::Split};

pub type HistoryEventProducer = ringbuf::HeapProd<HistoryEvent>;
pub type HistoryEventConsumer = ringbuf::HeapCons<HistoryEvent>;

pub fn create_event_channel(capacity: usize) -> (HistoryEventProducer, HistoryEventConsumer) {
    let rb = HeapRb::<HistoryEvent>::new(capacity);
    rb.split()
}
