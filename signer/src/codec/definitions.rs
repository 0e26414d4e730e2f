//! Field, transaction type and result definitions for the binary format.
//!
//! A field is identified on the wire by its `(type code, field code)` pair,
//! and canonical order is ascending by that pair. The tables below cover
//! every field a transaction (or the metadata the stream echoes back) can
//! carry.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Serialized type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeCode {
    UInt16 = 1,
    UInt32 = 2,
    UInt64 = 3,
    Hash128 = 4,
    Hash256 = 5,
    Amount = 6,
    Blob = 7,
    AccountId = 8,
    StObject = 14,
    StArray = 15,
    UInt8 = 16,
    Hash160 = 17,
    PathSet = 18,
    Vector256 = 19,
}

impl TypeCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => TypeCode::UInt16,
            2 => TypeCode::UInt32,
            3 => TypeCode::UInt64,
            4 => TypeCode::Hash128,
            5 => TypeCode::Hash256,
            6 => TypeCode::Amount,
            7 => TypeCode::Blob,
            8 => TypeCode::AccountId,
            14 => TypeCode::StObject,
            15 => TypeCode::StArray,
            16 => TypeCode::UInt8,
            17 => TypeCode::Hash160,
            18 => TypeCode::PathSet,
            19 => TypeCode::Vector256,
            _ => return None,
        })
    }

    /// Types whose payload is preceded by a length prefix.
    pub fn is_vl_encoded(self) -> bool {
        matches!(self, TypeCode::Blob | TypeCode::AccountId | TypeCode::Vector256)
    }
}

/// One serializable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub type_code: TypeCode,
    pub nth: u8,
    /// `false` for the fields that carry signatures themselves.
    pub is_signing_field: bool,
}

impl FieldDef {
    /// Canonical sort key.
    pub fn ordinal(&self) -> (u8, u8) {
        (self.type_code.code(), self.nth)
    }
}

macro_rules! fields {
    ($($ty:ident { $($name:ident = $nth:expr),* $(,)? })*) => {
        &[$($(FieldDef {
            name: stringify!($name),
            type_code: TypeCode::$ty,
            nth: $nth,
            is_signing_field: true,
        },)*)*]
    };
}

const SIGNING_EXCLUDED: &[&str] = &["TxnSignature", "Signers", "MasterSignature"];

const FIELD_TABLE: &[FieldDef] = fields! {
    UInt8 {
        CloseResolution = 1, Method = 2, TransactionResult = 3, TickSize = 16,
        UNLModifyDisabling = 17,
    }
    UInt16 {
        LedgerEntryType = 1, TransactionType = 2, SignerWeight = 3, TransferFee = 4,
    }
    UInt32 {
        NetworkID = 1, Flags = 2, SourceTag = 3, Sequence = 4, PreviousTxnLgrSeq = 5,
        LedgerSequence = 6, CloseTime = 7, ParentCloseTime = 8, SigningTime = 9,
        Expiration = 10, TransferRate = 11, WalletSize = 12, OwnerCount = 13,
        DestinationTag = 14, HighQualityIn = 16, HighQualityOut = 17, LowQualityIn = 18,
        LowQualityOut = 19, QualityIn = 20, QualityOut = 21, StampEscrow = 22,
        BondAmount = 23, LoadFee = 24, OfferSequence = 25, FirstLedgerSequence = 26,
        LastLedgerSequence = 27, TransactionIndex = 28, OperationLimit = 29,
        ReferenceFeeUnits = 30, ReserveBase = 31, ReserveIncrement = 32, SetFlag = 33,
        ClearFlag = 34, SignerQuorum = 35, CancelAfter = 36, FinishAfter = 37,
        SignerListID = 38, SettleDelay = 39, TicketCount = 40, TicketSequence = 41,
        NFTokenTaxon = 42, MintedNFTokens = 43, BurnedNFTokens = 44,
    }
    UInt64 {
        IndexNext = 1, IndexPrevious = 2, BookNode = 3, OwnerNode = 4, BaseFee = 5,
        ExchangeRate = 6, LowNode = 7, HighNode = 8, DestinationNode = 9, Cookie = 10,
        ServerVersion = 11, NFTokenOfferNode = 12,
    }
    Hash128 {
        EmailHash = 1,
    }
    Hash256 {
        LedgerHash = 1, ParentHash = 2, TransactionHash = 3, AccountHash = 4,
        PreviousTxnID = 5, LedgerIndex = 6, WalletLocator = 7, RootIndex = 8,
        AccountTxnID = 9, NFTokenID = 10, BookDirectory = 16, InvoiceID = 17,
        Nickname = 18, Amendment = 19, Digest = 21, Channel = 22, ConsensusHash = 23,
        CheckID = 24, ValidatedHash = 25, PreviousPageMin = 26, NextPageMin = 27,
        NFTokenBuyOffer = 28, NFTokenSellOffer = 29,
    }
    Amount {
        Amount = 1, Balance = 2, LimitAmount = 3, TakerPays = 4, TakerGets = 5,
        LowLimit = 6, HighLimit = 7, Fee = 8, SendMax = 9, DeliverMin = 10,
        MinimumOffer = 16, RippleEscrow = 17, DeliveredAmount = 18, NFTokenBrokerFee = 19,
    }
    Blob {
        PublicKey = 1, MessageKey = 2, SigningPubKey = 3, TxnSignature = 4, URI = 5,
        Signature = 6, Domain = 7, FundCode = 8, RemoveCode = 9, ExpireCode = 10,
        CreateCode = 11, MemoType = 12, MemoData = 13, MemoFormat = 14, Fulfillment = 16,
        Condition = 17, MasterSignature = 18, UNLModifyValidator = 19,
    }
    AccountId {
        Account = 1, Owner = 2, Destination = 3, Issuer = 4, Authorize = 5,
        Unauthorize = 6, RegularKey = 8, NFTokenMinter = 9,
    }
    StObject {
        ObjectEndMarker = 1, TransactionMetaData = 2, CreatedNode = 3, DeletedNode = 4,
        ModifiedNode = 5, PreviousFields = 6, FinalFields = 7, NewFields = 8,
        TemplateEntry = 9, Memo = 10, SignerEntry = 11, NFToken = 12, Signer = 16,
        Majority = 18, DisabledValidator = 19,
    }
    StArray {
        ArrayEndMarker = 1, Signers = 3, SignerEntries = 4, Template = 5, Necessary = 6,
        Sufficient = 7, AffectedNodes = 8, Memos = 9, NFTokens = 10, Majorities = 16,
        DisabledValidators = 17,
    }
    Hash160 {
        TakerPaysCurrency = 1, TakerPaysIssuer = 2, TakerGetsCurrency = 3,
        TakerGetsIssuer = 4,
    }
    PathSet {
        Paths = 1,
    }
    Vector256 {
        Indexes = 1, Hashes = 2, Amendments = 3, NFTokenOffers = 4,
    }
};

/// Transaction type names and their wire codes.
pub const TRANSACTION_TYPES: &[(&str, u16)] = &[
    ("Payment", 0),
    ("EscrowCreate", 1),
    ("EscrowFinish", 2),
    ("AccountSet", 3),
    ("EscrowCancel", 4),
    ("SetRegularKey", 5),
    ("OfferCreate", 7),
    ("OfferCancel", 8),
    ("TicketCreate", 10),
    ("SignerListSet", 12),
    ("PaymentChannelCreate", 13),
    ("PaymentChannelFund", 14),
    ("PaymentChannelClaim", 15),
    ("CheckCreate", 16),
    ("CheckCash", 17),
    ("CheckCancel", 18),
    ("DepositPreauth", 19),
    ("TrustSet", 20),
    ("AccountDelete", 21),
    ("NFTokenMint", 25),
    ("NFTokenBurn", 26),
    ("NFTokenCreateOffer", 27),
    ("NFTokenCancelOffer", 28),
    ("NFTokenAcceptOffer", 29),
    ("Clawback", 30),
    ("EnableAmendment", 100),
    ("SetFee", 101),
    ("UNLModify", 102),
];

/// Ledger entry type names (metadata only).
pub const LEDGER_ENTRY_TYPES: &[(&str, u16)] = &[
    ("NFTokenOffer", 0x0037),
    ("Check", 0x0043),
    ("NegativeUNL", 0x004e),
    ("NFTokenPage", 0x0050),
    ("SignerList", 0x0053),
    ("Ticket", 0x0054),
    ("AccountRoot", 0x0061),
    ("DirectoryNode", 0x0064),
    ("Amendments", 0x0066),
    ("LedgerHashes", 0x0068),
    ("Offer", 0x006f),
    ("DepositPreauth", 0x0070),
    ("RippleState", 0x0072),
    ("FeeSettings", 0x0073),
    ("Escrow", 0x0075),
    ("PayChannel", 0x0078),
];

/// Engine result names and codes that can appear in `TransactionResult`.
pub const TRANSACTION_RESULTS: &[(&str, u8)] = &[
    ("tesSUCCESS", 0),
    ("tecCLAIM", 100),
    ("tecPATH_PARTIAL", 101),
    ("tecUNFUNDED_ADD", 102),
    ("tecUNFUNDED_OFFER", 103),
    ("tecUNFUNDED_PAYMENT", 104),
    ("tecFAILED_PROCESSING", 105),
    ("tecDIR_FULL", 121),
    ("tecINSUF_RESERVE_LINE", 122),
    ("tecINSUF_RESERVE_OFFER", 123),
    ("tecNO_DST", 124),
    ("tecNO_DST_INSUF_XRP", 125),
    ("tecNO_LINE_INSUF_RESERVE", 126),
    ("tecNO_LINE_REDUNDANT", 127),
    ("tecPATH_DRY", 128),
    ("tecUNFUNDED", 129),
    ("tecNO_ALTERNATIVE_KEY", 130),
    ("tecNO_REGULAR_KEY", 131),
    ("tecOWNERS", 132),
    ("tecNO_ISSUER", 133),
    ("tecNO_AUTH", 134),
    ("tecNO_LINE", 135),
    ("tecINSUFF_FEE", 136),
    ("tecFROZEN", 137),
    ("tecNO_TARGET", 138),
    ("tecNO_PERMISSION", 139),
    ("tecNO_ENTRY", 140),
    ("tecINSUFFICIENT_RESERVE", 141),
    ("tecNEED_MASTER_KEY", 142),
    ("tecDST_TAG_NEEDED", 143),
    ("tecINTERNAL", 144),
    ("tecOVERSIZE", 145),
    ("tecCRYPTOCONDITION_ERROR", 146),
    ("tecINVARIANT_FAILED", 147),
    ("tecEXPIRED", 148),
    ("tecDUPLICATE", 149),
    ("tecKILLED", 150),
    ("tecHAS_OBLIGATIONS", 151),
    ("tecTOO_SOON", 152),
];

struct Index {
    by_name: HashMap<&'static str, FieldDef>,
    by_id: HashMap<(u8, u8), FieldDef>,
}

fn index() -> &'static Index {
    static INDEX: OnceLock<Index> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut by_name = HashMap::with_capacity(FIELD_TABLE.len());
        let mut by_id = HashMap::with_capacity(FIELD_TABLE.len());
        for def in FIELD_TABLE {
            let def = FieldDef {
                is_signing_field: !SIGNING_EXCLUDED.contains(&def.name),
                ..*def
            };
            by_name.insert(def.name, def);
            by_id.insert(def.ordinal(), def);
        }
        Index { by_name, by_id }
    })
}

/// Look a field up by its JSON name.
pub fn field_by_name(name: &str) -> Option<FieldDef> {
    index().by_name.get(name).copied()
}

/// Look a field up by its wire identifier.
pub fn field_by_id(type_code: u8, nth: u8) -> Option<FieldDef> {
    index().by_id.get(&(type_code, nth)).copied()
}

pub fn transaction_type_code(name: &str) -> Option<u16> {
    lookup_code(TRANSACTION_TYPES, name)
}

pub fn transaction_type_name(code: u16) -> Option<&'static str> {
    lookup_name(TRANSACTION_TYPES, code)
}

pub fn ledger_entry_type_code(name: &str) -> Option<u16> {
    lookup_code(LEDGER_ENTRY_TYPES, name)
}

pub fn ledger_entry_type_name(code: u16) -> Option<&'static str> {
    lookup_name(LEDGER_ENTRY_TYPES, code)
}

pub fn transaction_result_code(name: &str) -> Option<u8> {
    lookup_code(TRANSACTION_RESULTS, name)
}

pub fn transaction_result_name(code: u8) -> Option<&'static str> {
    lookup_name(TRANSACTION_RESULTS, code)
}

fn lookup_code<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

fn lookup_name<T: Copy + PartialEq>(table: &[(&'static str, T)], code: T) -> Option<&'static str> {
    table.iter().find(|(_, c)| *c == code).map(|(n, _)| *n)
}
