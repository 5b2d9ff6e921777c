//! Standard simulation events.

// VM LIFECYCLE EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    /// New VMs are created in the data center and should be placed.
    #[derive(Serialize)]
    pub struct VmsArrived {
        pub vm_ids: Vec<u32>,
    }

    #[derive(Serialize)]
    pub struct VmLifetimeExpired {
        pub vm_id: u32,
    }
}

// MIGRATION EVENTS ////////////////////////////////////////////////////////////////////////////////

pub mod migration {
    use serde::Serialize;

    /// Command to move VM between hosts, sent by the migration controller to the data center.
    #[derive(Serialize, Clone, Debug, PartialEq)]
    pub struct MigrateVm {
        pub vm_id: u32,
        pub from: u32,
        pub to: u32,
    }

    #[derive(Serialize)]
    pub struct VmMigrationCompleted {
        pub vm_id: u32,
        pub from: u32,
        pub to: u32,
    }
}
