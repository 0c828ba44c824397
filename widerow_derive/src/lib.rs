use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, Visibility, parse_macro_input};

/// Generates the `widerow::Entity` implementation, the `OnceLock`'d
/// metadata constructor, and the per-entity dirty-tracking wrapper type.
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(table = "users", keyspace = "app")]
/// struct User {
///     #[partition_key]
///     id: i64,
///     #[column(name = "user_name")]
///     name: String,
///     tags: widerow::Set<String>,
/// }
/// ```
///
/// Supported attributes:
/// - struct: `#[entity(table = "...", keyspace = "...",
///   read_consistency = "...", write_consistency = "...")]`
/// - field: `#[partition_key]` / `#[partition_key(order = N)]`,
///   `#[clustering_key]` / `#[clustering_key(order = N)]`,
///   `#[column(name = "...", static_column,
///   read_consistency = "...", write_consistency = "...")]`
///
/// Field classification follows the declared type: `Counter` fields are
/// counters, `List`/`Set`/`Map` fields are tracked collections, everything
/// else is a scalar column.
#[proc_macro_derive(Entity, attributes(entity, partition_key, clustering_key, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct EntityOptions {
    table: Option<String>,
    keyspace: Option<String>,
    read_consistency: Option<TokenStream2>,
    write_consistency: Option<TokenStream2>,
}

struct ColumnOptions {
    name: Option<String>,
    static_column: bool,
    read_consistency: Option<TokenStream2>,
    write_consistency: Option<TokenStream2>,
}

#[derive(Clone, Copy, PartialEq)]
enum FieldCategory {
    Scalar,
    Collection,
    Counter,
}

struct EntityField {
    ident: Ident,
    ty: Type,
    property: String,
    column: String,
    category: FieldCategory,
    key: Option<KeyRole>,
    static_column: bool,
    read_consistency: Option<TokenStream2>,
    write_consistency: Option<TokenStream2>,
}

#[derive(Clone, Copy, PartialEq)]
enum KeyRole {
    Partition(usize),
    Clustering(usize),
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;
    let vis = input.vis.clone();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs",
            ));
        }
    };
    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut fields = Vec::<EntityField>::new();
    let mut partition_seq = 0usize;
    let mut clustering_seq = 0usize;
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let column_options = parse_column_options(&field.attrs)?;
        let key = parse_key_role(&field.attrs, &mut partition_seq, &mut clustering_seq)?;
        let category = classify(&field.ty);

        if key.is_some() && category != FieldCategory::Scalar {
            return Err(syn::Error::new(
                field.span(),
                "key fields must be scalar columns",
            ));
        }
        if column_options.static_column && key.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "key fields cannot be static columns",
            ));
        }

        let property = ident.to_string();
        let column = column_options.name.clone().unwrap_or_else(|| property.clone());
        fields.push(EntityField {
            ident,
            ty: field.ty,
            property,
            column,
            category,
            key,
            static_column: column_options.static_column,
            read_consistency: column_options.read_consistency,
            write_consistency: column_options.write_consistency,
        });
    }

    if fields.is_empty() {
        return Err(syn::Error::new(
            struct_name.span(),
            "Entity requires at least one field",
        ));
    }
    if !fields.iter().any(|f| matches!(f.key, Some(KeyRole::Partition(_)))) {
        return Err(syn::Error::new(
            struct_name.span(),
            "Entity requires at least one #[partition_key] field",
        ));
    }

    let entity_name = struct_name.to_string();
    let table = options
        .table
        .clone()
        .unwrap_or_else(|| to_snake_case(&entity_name));
    let proxy_name = format_ident!("Managed{}", struct_name);

    let metadata_fn = gen_metadata(&entity_name, &table, &options.keyspace, &fields, &options);
    let primary_key_fn = gen_primary_key(&fields);
    let columns_fns = gen_column_access(&struct_name, &fields);
    let row_fn = gen_from_row(&fields);
    let tracking_fns = gen_tracking(&fields);
    let proxy = gen_proxy(&vis, &struct_name, &proxy_name, &fields);

    Ok(quote! {
        impl ::widerow::Entity for #struct_name {
            type Proxy = #proxy_name;

            #metadata_fn
            #primary_key_fn
            #columns_fns
            #row_fn
            #tracking_fns
        }

        #proxy
    })
}

fn gen_metadata(
    entity_name: &str,
    table: &str,
    keyspace: &Option<String>,
    fields: &[EntityField],
    options: &EntityOptions,
) -> TokenStream2 {
    let keyspace_setter = keyspace
        .as_ref()
        .map(|ks| quote! { .keyspace(#ks) });
    let read_setter = options
        .read_consistency
        .as_ref()
        .map(|level| quote! { .read_consistency(#level) });
    let write_setter = options
        .write_consistency
        .as_ref()
        .map(|level| quote! { .write_consistency(#level) });

    let properties = fields.iter().map(|f| {
        let property = &f.property;
        let column = &f.column;
        let ty = &f.ty;
        let kind = property_kind_tokens(f);
        let position = match f.key {
            Some(KeyRole::Partition(n)) | Some(KeyRole::Clustering(n)) => {
                Some(quote! { .key_position(#n) })
            }
            None => None,
        };
        let read = f
            .read_consistency
            .as_ref()
            .map(|level| quote! { .read_consistency(#level) });
        let write = f
            .write_consistency
            .as_ref()
            .map(|level| quote! { .write_consistency(#level) });
        quote! {
            .property(
                ::widerow::PropertyMeta::new(
                    #property,
                    #column,
                    <#ty as ::widerow::ColumnCodec>::cql_type(),
                    #kind,
                )
                #position #read #write
            )
        }
    });

    let panic_message = format!("invalid entity metadata for {entity_name}");
    quote! {
        fn metadata() -> &'static ::widerow::EntityMeta {
            static META: ::std::sync::OnceLock<::widerow::EntityMeta> =
                ::std::sync::OnceLock::new();
            META.get_or_init(|| {
                ::widerow::EntityMeta::builder(#entity_name, #table)
                    #keyspace_setter
                    #read_setter
                    #write_setter
                    #(#properties)*
                    .build()
                    .expect(#panic_message)
            })
        }
    }
}

fn property_kind_tokens(field: &EntityField) -> TokenStream2 {
    match (field.key, field.category, field.static_column) {
        (Some(KeyRole::Partition(_)), _, _) => quote! { ::widerow::PropertyKind::PartitionKey },
        (Some(KeyRole::Clustering(_)), _, _) => quote! { ::widerow::PropertyKind::ClusteringKey },
        (None, FieldCategory::Counter, true) => quote! { ::widerow::PropertyKind::StaticCounter },
        (None, FieldCategory::Counter, false) => quote! { ::widerow::PropertyKind::Counter },
        (None, FieldCategory::Collection, _) => {
            let ident = match last_segment_name(&field.ty).as_deref() {
                Some("List") => quote! { ::widerow::PropertyKind::List },
                Some("Set") => quote! { ::widerow::PropertyKind::Set },
                _ => quote! { ::widerow::PropertyKind::Map },
            };
            ident
        }
        (None, FieldCategory::Scalar, true) => quote! { ::widerow::PropertyKind::Static },
        (None, FieldCategory::Scalar, false) => quote! { ::widerow::PropertyKind::Regular },
    }
}

fn gen_primary_key(fields: &[EntityField]) -> TokenStream2 {
    let mut partition: Vec<&EntityField> = fields
        .iter()
        .filter(|f| matches!(f.key, Some(KeyRole::Partition(_))))
        .collect();
    partition.sort_by_key(|f| match f.key {
        Some(KeyRole::Partition(n)) => n,
        _ => 0,
    });
    let mut clustering: Vec<&EntityField> = fields
        .iter()
        .filter(|f| matches!(f.key, Some(KeyRole::Clustering(_))))
        .collect();
    clustering.sort_by_key(|f| match f.key {
        Some(KeyRole::Clustering(n)) => n,
        _ => 0,
    });

    let partition_pairs = partition.iter().map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        quote! { (#column.to_string(), ::widerow::ColumnCodec::to_column(&self.#ident)) }
    });
    let clustering_pairs = clustering.iter().map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        quote! { (#column.to_string(), ::widerow::ColumnCodec::to_column(&self.#ident)) }
    });

    quote! {
        fn primary_key(&self) -> ::widerow::PrimaryKey {
            ::widerow::PrimaryKey::composite(
                vec![ #(#partition_pairs),* ],
                vec![ #(#clustering_pairs),* ],
            )
        }
    }
}

fn gen_column_access(struct_name: &Ident, fields: &[EntityField]) -> TokenStream2 {
    let non_counter: Vec<&EntityField> = fields
        .iter()
        .filter(|f| f.category != FieldCategory::Counter)
        .collect();

    let to_pairs = non_counter.iter().map(|f| {
        let property = &f.property;
        let ident = &f.ident;
        quote! { (#property.to_string(), ::widerow::ColumnCodec::to_column(&self.#ident)) }
    });

    let column_arms = non_counter.iter().map(|f| {
        let property = &f.property;
        let ident = &f.ident;
        quote! { #property => Some(::widerow::ColumnCodec::to_column(&self.#ident)), }
    });

    let set_arms = fields.iter().map(|f| {
        let property = &f.property;
        let ident = &f.ident;
        quote! {
            #property => {
                self.#ident = ::widerow::ColumnCodec::from_column(value)?;
                Ok(())
            }
        }
    });

    let entity_name = struct_name.to_string();
    quote! {
        fn to_columns(&self) -> Vec<(String, ::widerow::ColumnValue)> {
            vec![ #(#to_pairs),* ]
        }

        fn column(&self, property: &str) -> Option<::widerow::ColumnValue> {
            match property {
                #(#column_arms)*
                _ => None,
            }
        }

        fn set_column(
            &mut self,
            property: &str,
            value: ::widerow::ColumnValue,
        ) -> ::widerow::Result<()> {
            match property {
                #(#set_arms)*
                other => Err(::widerow::PersistenceError::Metadata(format!(
                    "entity '{}' has no property '{}'",
                    #entity_name, other
                ))),
            }
        }
    }
}

fn gen_from_row(fields: &[EntityField]) -> TokenStream2 {
    let inits = fields.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! { #ident: row.decode(#column)? }
    });
    quote! {
        fn from_row(row: &::widerow::Row) -> ::widerow::Result<Self> {
            Ok(Self { #(#inits),* })
        }
    }
}

fn gen_tracking(fields: &[EntityField]) -> TokenStream2 {
    let collections: Vec<&EntityField> = fields
        .iter()
        .filter(|f| f.category == FieldCategory::Collection)
        .collect();
    let counters: Vec<&EntityField> = fields
        .iter()
        .filter(|f| f.category == FieldCategory::Counter)
        .collect();

    let dirty_checks = collections.iter().map(|f| {
        let property = &f.property;
        let ident = &f.ident;
        quote! {
            if self.#ident.is_touched() {
                touched.push(#property.to_string());
            }
        }
    });
    let clear_flags = collections.iter().map(|f| {
        let ident = &f.ident;
        quote! { self.#ident.reset_touched(); }
    });
    let delta_checks = counters.iter().map(|f| {
        let property = &f.property;
        let ident = &f.ident;
        quote! {
            if self.#ident.delta() != 0 {
                deltas.push((#property.to_string(), self.#ident.delta()));
            }
        }
    });
    let settles = counters.iter().map(|f| {
        let ident = &f.ident;
        quote! { self.#ident.settle(); }
    });
    let unset_checks = counters.iter().map(|f| {
        let ident = &f.ident;
        quote! { && self.#ident.is_unset() }
    });

    quote! {
        fn dirty_collections(&self) -> Vec<String> {
            let mut touched = Vec::new();
            #(#dirty_checks)*
            touched
        }

        fn clear_collection_flags(&mut self) {
            #(#clear_flags)*
        }

        fn counter_deltas(&self) -> Vec<(String, i64)> {
            let mut deltas = Vec::new();
            #(#delta_checks)*
            deltas
        }

        fn settle_counters(&mut self) {
            #(#settles)*
        }

        fn counters_unset(&self) -> bool {
            true #(#unset_checks)*
        }
    }
}

fn gen_proxy(
    vis: &Visibility,
    struct_name: &Ident,
    proxy_name: &Ident,
    fields: &[EntityField],
) -> TokenStream2 {
    let doc = format!(
        "Dirty-tracking wrapper for [`{struct_name}`], generated by `#[derive(Entity)]`."
    );

    let accessors = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let property = &f.property;
        match (f.key.is_some(), f.category) {
            // key fields: read-only
            (true, _) => quote! {
                #vis fn #ident(&self) -> &#ty {
                    &::widerow::Proxied::state(self).entity().#ident
                }
            },
            (false, FieldCategory::Scalar) => {
                let setter = format_ident!("set_{}", ident);
                quote! {
                    #vis fn #ident(&self) -> &#ty {
                        &::widerow::Proxied::state(self).entity().#ident
                    }

                    #vis fn #setter(&mut self, value: #ty) {
                        ::widerow::Proxied::state_mut(self)
                            .mutate(#property, |entity| entity.#ident = value);
                    }
                }
            }
            // tracked containers and counters flag mutation themselves
            (false, _) => {
                let getter_mut = format_ident!("{}_mut", ident);
                quote! {
                    #vis fn #ident(&self) -> &#ty {
                        &::widerow::Proxied::state(self).entity().#ident
                    }

                    #vis fn #getter_mut(&mut self) -> &mut #ty {
                        ::widerow::Proxied::state_mut(self)
                            .project_mut(|entity| &mut entity.#ident)
                    }
                }
            }
        }
    });

    quote! {
        #[doc = #doc]
        #vis struct #proxy_name {
            state: ::widerow::ManagedState<#struct_name>,
        }

        impl ::widerow::Proxied for #proxy_name {
            type Entity = #struct_name;

            fn wrap(state: ::widerow::ManagedState<#struct_name>) -> Self {
                Self { state }
            }

            fn state(&self) -> &::widerow::ManagedState<#struct_name> {
                &self.state
            }

            fn state_mut(&mut self) -> &mut ::widerow::ManagedState<#struct_name> {
                &mut self.state
            }

            fn into_state(self) -> ::widerow::ManagedState<#struct_name> {
                self.state
            }
        }

        impl #proxy_name {
            #(#accessors)*
        }

        impl ::core::fmt::Debug for #proxy_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!(#proxy_name)).finish_non_exhaustive()
            }
        }
    }
}

// -- attribute parsing -----------------------------------------------------

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions {
        table: None,
        keyspace: None,
        read_consistency: None,
        write_consistency: None,
    };

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                options.table = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("keyspace") {
                let lit: LitStr = meta.value()?.parse()?;
                options.keyspace = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("read_consistency") {
                let lit: LitStr = meta.value()?.parse()?;
                options.read_consistency = Some(consistency_tokens(&lit)?);
                return Ok(());
            }
            if meta.path.is_ident("write_consistency") {
                let lit: LitStr = meta.value()?.parse()?;
                options.write_consistency = Some(consistency_tokens(&lit)?);
                return Ok(());
            }
            Err(meta.error(
                "Unsupported entity attribute. Supported: table = \"...\", keyspace = \"...\", \
                 read_consistency = \"...\", write_consistency = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_column_options(attrs: &[syn::Attribute]) -> syn::Result<ColumnOptions> {
    let mut options = ColumnOptions {
        name: None,
        static_column: false,
        read_consistency: None,
        write_consistency: None,
    };

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                options.name = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("static_column") {
                options.static_column = true;
                return Ok(());
            }
            if meta.path.is_ident("read_consistency") {
                let lit: LitStr = meta.value()?.parse()?;
                options.read_consistency = Some(consistency_tokens(&lit)?);
                return Ok(());
            }
            if meta.path.is_ident("write_consistency") {
                let lit: LitStr = meta.value()?.parse()?;
                options.write_consistency = Some(consistency_tokens(&lit)?);
                return Ok(());
            }
            Err(meta.error(
                "Unsupported column attribute. Supported: name = \"...\", static_column, \
                 read_consistency = \"...\", write_consistency = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_key_role(
    attrs: &[syn::Attribute],
    partition_seq: &mut usize,
    clustering_seq: &mut usize,
) -> syn::Result<Option<KeyRole>> {
    let mut role = None;

    for attr in attrs {
        let (is_partition, is_clustering) = (
            attr.path().is_ident("partition_key"),
            attr.path().is_ident("clustering_key"),
        );
        if !is_partition && !is_clustering {
            continue;
        }
        if role.is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                "a field can carry at most one key attribute",
            ));
        }

        let mut order = None;
        if !matches!(attr.meta, syn::Meta::Path(_)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("order") {
                    let lit: syn::LitInt = meta.value()?.parse()?;
                    order = Some(lit.base10_parse::<usize>()?);
                    return Ok(());
                }
                Err(meta.error("Unsupported key attribute. Supported: order = <usize>"))
            })?;
        }

        role = Some(if is_partition {
            let position = order.unwrap_or(*partition_seq);
            *partition_seq += 1;
            KeyRole::Partition(position)
        } else {
            let position = order.unwrap_or(*clustering_seq);
            *clustering_seq += 1;
            KeyRole::Clustering(position)
        });
    }

    Ok(role)
}

fn consistency_tokens(value: &LitStr) -> syn::Result<TokenStream2> {
    let variant = match value.value().to_ascii_uppercase().as_str() {
        "ANY" => "Any",
        "ONE" => "One",
        "TWO" => "Two",
        "THREE" => "Three",
        "QUORUM" => "Quorum",
        "ALL" => "All",
        "LOCAL_QUORUM" => "LocalQuorum",
        "EACH_QUORUM" => "EachQuorum",
        "LOCAL_ONE" => "LocalOne",
        other => {
            return Err(syn::Error::new(
                value.span(),
                format!("unknown consistency level '{other}'"),
            ));
        }
    };
    let ident = format_ident!("{variant}");
    Ok(quote! { ::widerow::ConsistencyLevel::#ident })
}

fn classify(ty: &Type) -> FieldCategory {
    match last_segment_name(ty).as_deref() {
        Some("Counter") => FieldCategory::Counter,
        Some("List") | Some("Set") | Some("Map") => FieldCategory::Collection,
        _ => FieldCategory::Scalar,
    }
}

fn last_segment_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

fn to_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for (i, ch) in input.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
