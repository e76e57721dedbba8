/// Breakpoint addresses, kept sorted and unique.
#[derive(Debug, Default)]
pub struct Breakpoints(Vec<u8>);

impl Breakpoints {
    pub fn contains(&self, address: u8) -> bool {
        self.0.binary_search(&address).is_ok()
    }

    /// Returns whether the breakpoint was newly added.
    pub fn insert(&mut self, address: u8) -> bool {
        match self.0.binary_search(&address) {
            Ok(_) => false,
            Err(index) => {
                self.0.insert(index, address);
                true
            }
        }
    }

    /// Returns whether a breakpoint was found with given address.
    pub fn remove(&mut self, address: u8) -> bool {
        match self.0.binary_search(&address) {
            Ok(index) => {
                self.0.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_unique() {
        let mut breakpoints = Breakpoints::default();
        assert!(breakpoints.insert(9));
        assert!(breakpoints.insert(3));
        assert!(!breakpoints.insert(9));
        assert!(breakpoints.insert(0xff));
        assert_eq!(breakpoints.iter().collect::<Vec<_>>(), [3, 9, 0xff]);
        assert!(breakpoints.contains(3));

        assert!(breakpoints.remove(9));
        assert!(!breakpoints.remove(9));
        assert!(!breakpoints.contains(9));
        assert_eq!(breakpoints.len(), 2);
    }
}
