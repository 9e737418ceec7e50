//! Column families for organizing data.

/// Column families for organizing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnFamily {
    /// Ticket pool undo data (ticket type tag || block hash -> undo entries).
    TicketUndo,
    /// Tickets maturing at a block (ticket type tag || block hash -> hashes).
    NewTickets,
    /// Default column family (required by RocksDB).
    Default,
}

impl ColumnFamily {
    /// Get the string name of the column family.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::TicketUndo => "ticket_undo",
            ColumnFamily::NewTickets => "new_tickets",
            ColumnFamily::Default => "default",
        }
    }

    /// Get all column families.
    pub fn all() -> &'static [ColumnFamily] {
        &[
            ColumnFamily::TicketUndo,
            ColumnFamily::NewTickets,
            ColumnFamily::Default,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_column_family_names_unique() {
        let names: HashSet<_> = ColumnFamily::all().iter().map(|cf| cf.name()).collect();
        assert_eq!(names.len(), ColumnFamily::all().len());
        assert!(names.contains("default"));
        assert_eq!(
            ColumnFamily::all(),
            &[ColumnFamily::TicketUndo, ColumnFamily::NewTickets, ColumnFamily::Default]
        );
    }
}
