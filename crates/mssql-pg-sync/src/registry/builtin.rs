//! Tables synchronized by the stock deployment.

use super::TableDescriptor;

const DEFAULT_BATCH_SIZE: usize = 10_000;

const CUSTOMER_COLUMNS: &[&str] = &[
    "CD",
    "Name",
    "NameYomi",
    "Dairiten_ID",
    "CreationTime",
    "ModifiedTime",
    "Note",
];

const MCTM_MODULE_COLUMNS: &[&str] = &[
    "ID",
    "IPAddress",
    "Carrier",
    "Tel",
    "SIMNo",
    "Customer_CD",
    "IsDeleted",
    "CreationTime",
    "ModifiedTime",
    "DeletedTime",
    "PSID",
    "IIJ_SvcCode1",
    "IIJ_SvcCode2",
    "PPP_ID",
    "PPP_Pass",
    "VersionInfo1",
    "VersionInfo2",
    "VersionInfo3",
    "VersionInfo4",
    "VersionInfo5",
    "ReceivedTime",
];

const VOIPDB_CUSTOMER_COLUMNS: &[&str] = &[
    "Cd",
    "GlobalCustomerCd",
    "CustomerName",
    "SessionServerAddress",
    "SessionServerTcpPort",
    "SessionServerUdpPort",
    "LicenseCount",
    "LicenseCountForSmapho",
    "LicenseSerial",
    "MaintenancePasswd",
    "MutsuuwaDisconnectTime",
    "RouteMode",
    "MaxRecieveChannel",
    "VPTSetting_ID",
    "ShuhenDistance",
    "DisconnectMode",
    "IsSuspended",
    "RelayBufferSize",
    "MaxRelayMemberCount",
    "MaxJoinChannelCount",
    "AttributeJson",
    "SipTranscoderId1",
    "SipTranscoderId2",
    "LicenseCountForSmaphoTrial",
    "SmaphoTrialFrom",
    "SmaphoTrialTo",
    "MaxAvailableGroupCd",
    "LicenseCountForMaintenance",
];

const VOIPDB_USERAGENT_COLUMNS: &[&str] = &[
    "CustomerCd",
    "Cd",
    "IPAddress",
    "VoiceListenPort",
    "SessionListenPort",
    "UAType",
    "LicenseCert",
    "DisplayName",
    "DefaultGroupCd",
    "Network",
    "OpCenters",
    "OpCenters_CD",
    "MainChannelGroupCd",
    "CurrentChannelNo",
    "CurrentChannelNos",
    "IsStateListener",
    "ProductType",
    "ProductVersion",
    "Priority",
    "AudioFmtVersion",
    "SessionFmtVersion",
    "UID",
    "AttributeJson",
    "GgwTerminalID",
    "Id",
    "IsSmaphoTrialLicense",
    "ApplyedSettingID",
    "ApplyedSettingRevNo",
];

/// Default sync order for the built-in tables.
pub const DEFAULT_ORDER: &[&str] = &[
    "customer",
    "mctm_module",
    "voipdb_customer",
    "voipdb_useragent",
];

struct BuiltinTable {
    name: &'static str,
    source_system: &'static str,
    source_database: &'static str,
    source_object: &'static str,
    destination_object: &'static str,
    columns: &'static [&'static str],
    ordering_key: &'static str,
    description: &'static str,
}

const TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        name: "customer",
        source_system: "mctm",
        source_database: "McTM",
        source_object: "[McTM].[dbo].[Customer]",
        destination_object: "mctm_customer",
        columns: CUSTOMER_COLUMNS,
        ordering_key: "CD",
        description: "McTM customer master",
    },
    BuiltinTable {
        name: "mctm_module",
        source_system: "mctm",
        source_database: "McTM",
        source_object: "[McTM].[dbo].[McModule]",
        destination_object: "mctm_module",
        columns: MCTM_MODULE_COLUMNS,
        ordering_key: "ID",
        description: "McTM modules with SIM and carrier details",
    },
    BuiltinTable {
        name: "voipdb_customer",
        source_system: "voipdb",
        source_database: "VoipDB",
        source_object: "[VoipDB].[dbo].[Customer]",
        destination_object: "voipdb_customer",
        columns: VOIPDB_CUSTOMER_COLUMNS,
        ordering_key: "Cd",
        description: "VoipDB customers with license and session server settings",
    },
    BuiltinTable {
        name: "voipdb_useragent",
        source_system: "voipdb",
        source_database: "VoipDB",
        source_object: "[VoipDB].[dbo].[UserAgent]",
        destination_object: "voipdb_useragent",
        columns: VOIPDB_USERAGENT_COLUMNS,
        ordering_key: "Id",
        description: "VoipDB user agents",
    },
];

/// Descriptors for the built-in tables, in registry order.
pub fn tables() -> Vec<TableDescriptor> {
    TABLES
        .iter()
        .map(|t| TableDescriptor {
            name: t.name.to_string(),
            source_system: t.source_system.to_string(),
            source_database: Some(t.source_database.to_string()),
            source_object: t.source_object.to_string(),
            destination_object: t.destination_object.to_string(),
            source_columns: t.columns.iter().map(|c| c.to_string()).collect(),
            destination_columns: t.columns.iter().map(|c| c.to_lowercase()).collect(),
            ordering_key: t.ordering_key.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            description: t.description.to_string(),
        })
        .collect()
}
