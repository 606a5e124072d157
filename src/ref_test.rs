#[derive(Clone)]
struct RefNode {
    key: i64,
    value: i64,
}

// Reference index over keys 0..capacity, a slot per key.
struct RefNodes {
    entries: Vec<RefNode>,
}

impl RefNodes {
    fn new(capacity: usize) -> RefNodes {
        let mut entries: Vec<RefNode> = Vec::with_capacity(capacity);
        (0..capacity).for_each(|_| entries.push(RefNode { key: -1, value: 0 }));
        RefNodes { entries }
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|item| item.key >= 0).count()
    }

    fn get(&self, key: i64) -> Option<i64> {
        let entry = self.entries[key as usize].clone();
        if entry.key < 0 {
            None
        } else {
            Some(entry.value)
        }
    }

    fn iter(&self) -> std::vec::IntoIter<(i64, i64)> {
        self.entries
            .iter()
            .filter_map(|item| {
                if item.key < 0 {
                    None
                } else {
                    Some((item.key, item.value))
                }
            })
            .collect::<Vec<(i64, i64)>>()
            .into_iter()
    }

    // insert only when missing, return whether it was inserted.
    fn insert(&mut self, key: i64, value: i64) -> bool {
        let entry = &mut self.entries[key as usize];
        if entry.key < 0 {
            entry.key = key;
            entry.value = value;
            true
        } else {
            false
        }
    }

    fn set(&mut self, key: i64, value: i64) -> Option<i64> {
        let entry = &mut self.entries[key as usize];
        let old_value = if entry.key < 0 {
            None
        } else {
            Some(entry.value)
        };
        entry.key = key;
        entry.value = value;
        old_value
    }

    fn delete(&mut self, key: i64) -> Option<i64> {
        let entry = &mut self.entries[key as usize];
        if entry.key < 0 {
            None
        } else {
            entry.key = -1;
            Some(entry.value)
        }
    }
}
