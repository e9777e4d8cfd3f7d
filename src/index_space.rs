use core::ops::Range;




#[derive(Clone, Debug, PartialEq, Eq)]


/**
 * Represents a contiguous run of cells in the global (signed) cell index
 * space. Indexes below zero or beyond the last grid cell label ghost cells.
 */
pub struct IndexSpace {
    di: Range<i64>,
}




/**
 * Describes a 1D index space. The index type is signed 64-bit integer.
 */
impl IndexSpace {


    pub fn new(di: Range<i64>) -> Self {

        assert!(
            di.start <= di.end,
            "index space has negative volume");

        Self { di }
    }


    /**
     * Return the number of indexes in this index space.
     */
    pub fn len(&self) -> usize {
        (self.di.end - self.di.start) as usize
    }


    /**
     * Determine whether this index space has no elements.
     */
    pub fn is_empty(&self) -> bool {
        self.di.start == self.di.end
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> i64 {
        self.di.start
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> i64 {
        self.di.end
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: i64) -> bool {
        self.di.contains(&index)
    }


    /**
     * Determine whether another index space is a subset of this one.
     */
    pub fn contains_space(&self, other: &Self) -> bool {
        other.di.start >= self.di.start && other.di.end <= self.di.end
    }


    /**
     * Expand this index space by the given number of elements on both ends.
     */
    pub fn extend_all(&self, delta: i64) -> Self {
        Self::new(self.di.start - delta .. self.di.end + delta)
    }


    /**
     * Return the memory offset of the given index, in a buffer aligned with
     * the start of this index space.
     */
    pub fn offset(&self, index: i64) -> usize {
        (index - self.di.start) as usize
    }


    /**
     * Return the row range occupied by this index space inside the buffer
     * allocated for another one.
     */
    pub fn rows_in(&self, parent: &Self) -> Range<usize> {
        assert!(
            parent.contains_space(self),
            "index space {:?} is not inside {:?}", self.di, parent.di);

        parent.offset(self.di.start) .. parent.offset(self.di.end)
    }


    /**
     * Return an iterator over the indexes, in increasing order.
     */
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.di.clone()
    }


    /**
     * Return the range of non-negative indexes as `usize`. Panics if the
     * space contains ghost indexes below zero.
     */
    pub fn to_usize_range(&self) -> Range<usize> {
        assert!(self.di.start >= 0, "index space reaches below zero");
        self.di.start as usize .. self.di.end as usize
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range1d(di: Range<i64>) -> IndexSpace {
    IndexSpace::new(di)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::range1d;

    #[test]
    fn extend_all_grows_both_ends() {
        let space = range1d(4..10);
        assert_eq!(space.extend_all(3), range1d(1..13));
        assert!(space.extend_all(3).contains_space(&space));
    }

    #[test]
    fn rows_in_parent_are_offset_from_parent_start() {
        let window = range1d(-3..13);
        let owned = range1d(0..10);
        assert_eq!(owned.rows_in(&window), 3..13);
        assert_eq!(window.offset(-3), 0);
    }

    #[test]
    #[should_panic]
    fn rows_in_rejects_foreign_space() {
        range1d(0..20).rows_in(&range1d(0..10));
    }
}
