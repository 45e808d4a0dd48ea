// In-memory priority queue (binary max-heap)

/// Heap entry: an item plus the priority it was enqueued with
#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    priority: i32,
}

/// Binary max-heap keyed by an explicit numeric priority.
///
/// Equal priorities are NOT dequeued in insertion order; nothing relies on
/// tie-break order. No internal locking: the owner serializes access.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: Vec<Entry<T>>,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self { heap: Vec::new() }
    }
}

impl<T: PartialEq> PriorityQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(log n)
    pub fn enqueue(&mut self, item: T, priority: i32) {
        self.heap.push(Entry { item, priority });
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the highest-priority item. O(log n)
    pub fn dequeue(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let top = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        top.map(|entry| entry.item)
    }

    /// O(1)
    pub fn peek(&self) -> Option<&T> {
        self.heap.first().map(|entry| &entry.item)
    }

    /// Priority of the current head, if any
    pub fn peek_priority(&self) -> Option<i32> {
        self.heap.first().map(|entry| entry.priority)
    }

    /// Remove an arbitrary item. O(n) lookup + O(log n) repair.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(index) = self.heap.iter().position(|entry| &entry.item == item) else {
            return false;
        };

        let last = self.heap.len() - 1;
        self.heap.swap(index, last);
        self.heap.pop();

        if index < self.heap.len() {
            // The moved element may belong above or below its new slot
            self.sift_up(index);
            self.sift_down(index);
        }
        true
    }

    pub fn has(&self, item: &T) -> bool {
        self.heap.iter().any(|entry| &entry.item == item)
    }

    pub fn size(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].priority <= self.heap[parent].priority {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut largest = index;

            if left < len && self.heap[left].priority > self.heap[largest].priority {
                largest = left;
            }
            if right < len && self.heap[right].priority > self.heap[largest].priority {
                largest = right;
            }
            if largest == index {
                break;
            }
            self.heap.swap(index, largest);
            index = largest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequeues_highest_priority_first() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("low", 1);
        queue.enqueue("critical", 4);
        queue.enqueue("medium", 2);
        queue.enqueue("high", 3);

        assert_eq!(queue.peek(), Some(&"critical"));
        assert_eq!(queue.dequeue(), Some("critical"));
        assert_eq!(queue.dequeue(), Some("high"));
        assert_eq!(queue.dequeue(), Some("medium"));
        assert_eq!(queue.dequeue(), Some("low"));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_remove_keeps_heap_order() {
        let mut queue = PriorityQueue::new();
        for (i, priority) in [5, 9, 1, 7, 3, 8, 2, 6, 4].into_iter().enumerate() {
            queue.enqueue(i, priority);
        }

        // Remove an interior node (priority 7) and a leaf (priority 4)
        assert!(queue.remove(&3));
        assert!(queue.remove(&8));
        assert!(!queue.remove(&3));
        assert!(!queue.has(&3));
        assert_eq!(queue.size(), 7);

        let mut priorities = Vec::new();
        while let Some(priority) = queue.peek_priority() {
            priorities.push(priority);
            queue.dequeue();
        }
        assert_eq!(priorities, vec![9, 8, 6, 5, 3, 2, 1]);
    }

    #[test]
    fn test_remove_last_element() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("a", 1);
        assert!(queue.remove(&"a"));
        assert!(queue.is_empty());
        assert_eq!(queue.peek(), None);
    }

    #[test]
    fn test_equal_priorities_all_returned() {
        let mut queue = PriorityQueue::new();
        for id in ["a", "b", "c"] {
            queue.enqueue(id, 2);
        }

        let mut drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
        drained.sort();
        assert_eq!(drained, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clear() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(1, 1);
        queue.enqueue(2, 2);
        queue.clear();
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.dequeue(), None);
    }
}
