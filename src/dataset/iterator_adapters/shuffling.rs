use rand::seq::SliceRandom;
use rand::Rng;

/// Buffers up to `max_elements_to_buffer` elements and hands them out in random order. A buffer
/// at least as large as the iterator gives a full shuffle.
pub trait Shuffling: Iterator {
    fn shuffling<R: Rng>(self, max_elements_to_buffer: usize, rng: R) -> Shuffler<Self, R>
    where
        Self: std::marker::Sized,
    {
        Shuffler {
            iterator: self,
            max_elements_to_buffer,
            buffer: vec![],
            rng,
        }
    }
}

pub struct Shuffler<T: Iterator, R: Rng> {
    iterator: T,
    max_elements_to_buffer: usize,
    buffer: Vec<T::Item>,
    rng: R,
}

impl<T: Iterator, R: Rng> Iterator for Shuffler<T, R> {
    type Item = T::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill_buffer_if_needed_and_shuffle();
        self.buffer.pop()
    }
}

impl<T: Iterator, R: Rng> Shuffler<T, R> {
    fn fill_buffer_if_needed_and_shuffle(&mut self) {
        let mut added_item = false;
        while self.buffer.len() < self.max_elements_to_buffer {
            match self.iterator.next() {
                None => {
                    break;
                }
                Some(element) => {
                    self.buffer.push(element);
                    added_item = true;
                }
            }
        }
        if added_item {
            self.buffer.shuffle(&mut self.rng);
        }
    }
}

impl<T: ?Sized> Shuffling for T where T: Iterator {}
