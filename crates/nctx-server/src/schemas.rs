//! Reference schemas served by the loopback backend.

use nctx_schema::{SchemaResult, StaticSchema};
use nctx_types::{Identity, LeafType, TypeInfo};

pub const EXAMPLE_MODULE: &str = "example-schema";
pub const NETCONF_SERVER_MODULE: &str = "ietf-netconf-server";

/// The `example-schema` module alone.
pub fn example_schema() -> SchemaResult<StaticSchema> {
    let mut schema = StaticSchema::new();
    add_example_module(&mut schema)?;
    Ok(schema)
}

/// The `ietf-netconf-server` subset alone.
pub fn netconf_server_schema() -> SchemaResult<StaticSchema> {
    let mut schema = StaticSchema::new();
    add_netconf_server_module(&mut schema)?;
    Ok(schema)
}

/// Both reference modules in one schema.
pub fn reference_schema() -> SchemaResult<StaticSchema> {
    let mut schema = StaticSchema::new();
    add_example_module(&mut schema)?;
    add_netconf_server_module(&mut schema)?;
    Ok(schema)
}

/// Integer leaves of every width, an enum, a decimal, a pair of booleans,
/// a `person` list keyed by `name` with a leafref pointing into it, a
/// presence container, a leaf-list, a user-ordered list and leaf-list,
/// one state leaf, a `reboot` rpc and a `poke` action on `person`.
pub fn add_example_module(schema: &mut StaticSchema) -> SchemaResult<()> {
    schema.add_module(EXAMPLE_MODULE);
    let path = |rest: &str| format!("/{EXAMPLE_MODULE}:{rest}");

    let integers = [
        ("leafInt8", LeafType::Int8),
        ("leafInt16", LeafType::Int16),
        ("leafInt32", LeafType::Int32),
        ("leafInt64", LeafType::Int64),
        ("leafUInt8", LeafType::Uint8),
        ("leafUInt16", LeafType::Uint16),
        ("leafUInt32", LeafType::Uint32),
        ("leafUInt64", LeafType::Uint64),
    ];
    for (name, leaf_type) in integers {
        schema.add_leaf(&path(name), TypeInfo::new(leaf_type))?;
    }

    schema.add_leaf(&path("leafEnum"), TypeInfo::enumeration(["lol", "data", "coze"]))?;
    schema.add_leaf(
        &path("leafDecimal"),
        TypeInfo::new(LeafType::Decimal { fraction_digits: 3 }),
    )?;
    schema.add_leaf(
        &path("leafString"),
        TypeInfo::new(LeafType::String).with_length(0, 64),
    )?;
    schema.add_leaf(&path("leafBinary"), TypeInfo::new(LeafType::Binary))?;
    let foods = [
        Identity::new(EXAMPLE_MODULE, "pizza"),
        Identity::new(EXAMPLE_MODULE, "spaghetti"),
    ];
    schema.add_leaf(
        &path("leafIdentity"),
        TypeInfo::new(LeafType::IdentityRef(foods.into_iter().collect())),
    )?;
    schema.add_leaf(&path("up"), TypeInfo::new(LeafType::Bool))?;
    schema.add_leaf(&path("down"), TypeInfo::new(LeafType::Bool))?;

    schema.add_container(&path("lol"), false)?;
    schema.add_leaf(&path("lol/hey"), TypeInfo::new(LeafType::String))?;

    schema.add_list(&path("person"), &["name"])?;
    schema.add_leaf(&path("person/name"), TypeInfo::new(LeafType::String))?;
    schema.add_leaf(
        &path("person/age"),
        TypeInfo::new(LeafType::Uint8).with_range(0, 150),
    )?;
    schema.add_leaf(
        &path("bossPerson"),
        TypeInfo::leafref(path("person/name"), TypeInfo::new(LeafType::String)),
    )?;

    schema.add_container(&path("pContainer"), true)?;
    schema.add_leaf(&path("pContainer/note"), TypeInfo::new(LeafType::String))?;

    schema.add_leaf_list(&path("addresses"), TypeInfo::new(LeafType::String))?;

    schema.add_list(&path("players"), &["name"])?;
    schema.add_leaf(&path("players/name"), TypeInfo::new(LeafType::String))?;
    schema.add_leaf(&path("players/score"), TypeInfo::new(LeafType::Uint32))?;
    schema.order_by_user(&path("players"))?;
    schema.add_leaf_list(&path("protocols"), TypeInfo::new(LeafType::String))?;
    schema.order_by_user(&path("protocols"))?;

    schema.add_state_leaf(
        &path("temperature"),
        TypeInfo::new(LeafType::Int32).with_units("celsius"),
    )?;

    schema.add_operation(&path("reboot"))?;
    schema.add_leaf(
        &path("reboot/input/delay"),
        TypeInfo::new(LeafType::Uint32).with_units("seconds"),
    )?;
    schema.add_leaf(&path("reboot/input/reason"), TypeInfo::new(LeafType::String))?;
    schema.add_leaf(&path("reboot/output/scheduled"), TypeInfo::new(LeafType::Bool))?;

    schema.add_operation(&path("person/poke"))?;
    schema.add_leaf(&path("person/poke/input/times"), TypeInfo::new(LeafType::Uint8))?;
    schema.add_leaf(&path("person/poke/output/reply"), TypeInfo::new(LeafType::String))?;
    Ok(())
}

/// `netconf-server/session-options/hello-timeout`, a `uint16` in seconds.
pub fn add_netconf_server_module(schema: &mut StaticSchema) -> SchemaResult<()> {
    schema.add_module(NETCONF_SERVER_MODULE);
    let root = format!("/{NETCONF_SERVER_MODULE}:netconf-server");
    schema.add_container(&root, false)?;
    schema.add_container(&format!("{root}/session-options"), false)?;
    schema.add_leaf(
        &format!("{root}/session-options/hello-timeout"),
        TypeInfo::new(LeafType::Uint16)
            .with_units("seconds")
            .with_description("How long to wait for a client hello"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nctx_schema::SchemaOracle;

    #[test]
    fn reference_schema_has_both_modules() {
        let schema = reference_schema().unwrap();
        assert_eq!(schema.modules(), vec![EXAMPLE_MODULE.to_string(), NETCONF_SERVER_MODULE.to_string()]);
        let timeout = schema
            .node("/ietf-netconf-server:netconf-server/ietf-netconf-server:session-options/ietf-netconf-server:hello-timeout")
            .unwrap();
        assert!(timeout.is_leaf());
        assert_eq!(timeout.type_info().unwrap().leaf_type, LeafType::Uint16);
    }

    #[test]
    fn example_schema_shapes() {
        let schema = example_schema().unwrap();
        let person = schema.node("/example-schema:person").unwrap();
        assert_eq!(person.keys(), ["name".to_string()]);
        assert!(schema.node("/example-schema:pContainer").unwrap().is_presence_container());
        assert!(!schema.node("/example-schema:temperature").unwrap().config);
        assert!(schema.node("/example-schema:addresses").unwrap().is_leaf_list());
        assert!(!schema.node("/example-schema:addresses").unwrap().is_user_ordered());
        assert!(schema.node("/example-schema:players").unwrap().is_user_ordered());
        assert!(schema.node("/example-schema:protocols").unwrap().is_user_ordered());
        assert!(schema.node("/example-schema:reboot").unwrap().is_operation());
        assert!(schema
            .node("/example-schema:person/example-schema:poke/example-schema:input/example-schema:times")
            .is_some());
        assert!(!schema.has_module(NETCONF_SERVER_MODULE));
    }

    #[test]
    fn netconf_server_schema_alone() {
        let schema = netconf_server_schema().unwrap();
        assert!(schema.has_module(NETCONF_SERVER_MODULE));
        assert!(!schema.has_module(EXAMPLE_MODULE));
    }
}
