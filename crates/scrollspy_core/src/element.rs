//! Element identity shared between the tracker and its host

slotmap::new_key_type! {
    /// Handle of an element known to the host document
    ///
    /// The tracker never dereferences it; it is passed back verbatim to the
    /// notification sink and the callback slots.
    pub struct ElementId;
}
