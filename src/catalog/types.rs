//! Entity types of the program model

use super::branches;
use crate::error::Result;
use crate::schema::SchemaBuilder;

pub(super) fn declare(b: &mut SchemaBuilder) -> Result<()> {
    // ========== Structure ==========

    b.declare_union("container", &[])?;
    b.declare_union("locatable", &[])?;
    b.declare_union("node", &["locatable"])?;
    b.declare_union("documentable", &["node"])?;
    b.declare_union("exprparent", &["node"])?;
    b.declare_union("fieldparent", &["node"])?;
    b.declare_union("stmtparent", &["node"])?;
    b.declare_union("declparent", &["node"])?;
    b.declare_union("funcdef", &["stmtparent", "exprparent"])?;
    b.declare_union("scopenode", &["node"])?;

    b.declare_primary_key("location_default", &[])?;
    b.declare_primary_key(
        "file",
        &["container", "documentable", "exprparent", "declparent", "scopenode"],
    )?;
    b.declare_primary_key("folder", &["container"])?;
    b.declare_primary_key("comment_group", &["node"])?;
    b.declare_primary_key("comment", &["node"])?;
    b.declare_primary_key("expr", &["exprparent"])?;
    b.declare_primary_key("field", &["documentable", "exprparent"])?;
    b.declare_primary_key("stmt", &["exprparent", "stmtparent"])?;
    b.declare_primary_key("decl", &["exprparent", "stmtparent", "fieldparent"])?;
    b.declare_primary_key("spec", &["exprparent", "documentable"])?;
    b.declare_primary_key("type", &[])?;

    b.declare_alias("location", "location_default")?;
    b.declare_alias("sourceline", "locatable")?;

    // ========== Comments ==========

    let comment = b.declare_case("comment", "kind")?;
    branches(b, comment, &[("slashslashcomment", &[]), ("slashstarcomment", &[])])?;

    // ========== Expressions ==========

    let expr = b.declare_case("expr", "kind")?;
    branches(b, expr, &[("badexpr", &[]), ("ident", &[]), ("ellipsis", &[])])?;

    b.declare_union("basiclit", &[])?;
    branches(
        b,
        expr,
        &[
            ("intlit", &["basiclit"]),
            ("floatlit", &["basiclit"]),
            ("imaglit", &["basiclit"]),
            ("charlit", &["basiclit"]),
            ("stringlit", &["basiclit"]),
            ("funclit", &["funcdef"]),
            ("compositelit", &[]),
            ("parenexpr", &[]),
            ("selectorexpr", &[]),
            ("indexexpr", &[]),
            ("sliceexpr", &[]),
            ("typeassertexpr", &[]),
            ("callorconversionexpr", &[]),
            ("starexpr", &[]),
        ],
    )?;

    b.declare_union("operatorexpr", &[])?;
    b.declare_union("logicalexpr", &["operatorexpr"])?;
    b.declare_union("arithmeticexpr", &["operatorexpr"])?;
    b.declare_union("bitwiseexpr", &["operatorexpr"])?;
    b.declare_union("unaryexpr", &["operatorexpr"])?;
    b.declare_union("logicalunaryexpr", &["unaryexpr", "logicalexpr"])?;
    b.declare_union("bitwiseunaryexpr", &["unaryexpr", "bitwiseexpr"])?;
    b.declare_union("arithmeticunaryexpr", &["unaryexpr", "arithmeticexpr"])?;
    b.declare_union("binaryexpr", &["operatorexpr"])?;
    b.declare_union("logicalbinaryexpr", &["binaryexpr", "logicalexpr"])?;
    b.declare_union("bitwisebinaryexpr", &["binaryexpr", "bitwiseexpr"])?;
    b.declare_union("arithmeticbinaryexpr", &["binaryexpr", "arithmeticexpr"])?;
    b.declare_union("shiftexpr", &["bitwisebinaryexpr"])?;
    b.declare_union("comparison", &["binaryexpr"])?;
    b.declare_union("equalitytest", &["comparison"])?;
    b.declare_union("relationalcomparison", &["comparison"])?;

    branches(
        b,
        expr,
        &[
            ("keyvalueexpr", &[]),
            ("arraytypeexpr", &[]),
            ("structtypeexpr", &["fieldparent"]),
            ("functypeexpr", &["fieldparent", "scopenode"]),
            ("interfacetypeexpr", &["fieldparent"]),
            ("maptypeexpr", &[]),
        ],
    )?;

    b.declare_union("chantypeexpr", &[])?;

    // Unary operators
    branches(
        b,
        expr,
        &[
            ("plusexpr", &["arithmeticunaryexpr"]),
            ("minusexpr", &["arithmeticunaryexpr"]),
            ("notexpr", &["logicalunaryexpr"]),
            ("complementexpr", &["bitwiseunaryexpr"]),
            ("derefexpr", &["unaryexpr"]),
            ("addressexpr", &["unaryexpr"]),
            ("arrowexpr", &["unaryexpr"]),
        ],
    )?;

    // Binary operators
    branches(
        b,
        expr,
        &[
            ("lorexpr", &["logicalbinaryexpr"]),
            ("landexpr", &["logicalbinaryexpr"]),
            ("eqlexpr", &["equalitytest"]),
            ("neqexpr", &["equalitytest"]),
            ("lssexpr", &["relationalcomparison"]),
            ("leqexpr", &["relationalcomparison"]),
            ("gtrexpr", &["relationalcomparison"]),
            ("geqexpr", &["relationalcomparison"]),
            ("addexpr", &["arithmeticbinaryexpr"]),
            ("subexpr", &["arithmeticbinaryexpr"]),
            ("orexpr", &["bitwisebinaryexpr"]),
            ("xorexpr", &["bitwisebinaryexpr"]),
            ("mulexpr", &["arithmeticbinaryexpr"]),
            ("quoexpr", &["arithmeticbinaryexpr"]),
            ("remexpr", &["arithmeticbinaryexpr"]),
            ("shlexpr", &["shiftexpr"]),
            ("shrexpr", &["shiftexpr"]),
            ("andexpr", &["bitwisebinaryexpr"]),
            ("andnotexpr", &["bitwisebinaryexpr"]),
        ],
    )?;

    // Channel type expressions
    branches(
        b,
        expr,
        &[
            ("sendchantypeexpr", &["chantypeexpr"]),
            ("recvchantypeexpr", &["chantypeexpr"]),
            ("sendrcvchantypeexpr", &["chantypeexpr"]),
        ],
    )?;

    // ========== Statements ==========

    let stmt = b.declare_case("stmt", "kind")?;
    branches(
        b,
        stmt,
        &[
            ("badstmt", &[]),
            ("declstmt", &["declparent"]),
            ("emptystmt", &[]),
            ("labeledstmt", &[]),
            ("exprstmt", &[]),
            ("sendstmt", &[]),
        ],
    )?;

    b.declare_union("incdecstmt", &[])?;
    branches(b, stmt, &[("incstmt", &["incdecstmt"]), ("decstmt", &["incdecstmt"])])?;

    b.declare_union("assignment", &[])?;
    b.declare_union("simpleassignstmt", &["assignment"])?;
    b.declare_union("compoundassignstmt", &["assignment"])?;
    branches(b, stmt, &[("gostmt", &[]), ("deferstmt", &[]), ("returnstmt", &[])])?;

    b.declare_union("branchstmt", &[])?;
    branches(
        b,
        stmt,
        &[
            ("breakstmt", &["branchstmt"]),
            ("continuestmt", &["branchstmt"]),
            ("gotostmt", &["branchstmt"]),
            ("fallthroughstmt", &["branchstmt"]),
            ("blockstmt", &["scopenode"]),
            ("ifstmt", &["scopenode"]),
            ("caseclause", &["scopenode"]),
        ],
    )?;

    b.declare_union("switchstmt", &["scopenode"])?;
    branches(
        b,
        stmt,
        &[
            ("exprswitchstmt", &["switchstmt"]),
            ("typeswitchstmt", &["switchstmt"]),
            ("commclause", &["scopenode"]),
            ("selectstmt", &[]),
        ],
    )?;

    b.declare_union("loopstmt", &["scopenode"])?;
    branches(b, stmt, &[("forstmt", &["loopstmt"]), ("rangestmt", &["loopstmt"])])?;

    // Assignment operators
    branches(
        b,
        stmt,
        &[
            ("assignstmt", &["simpleassignstmt"]),
            ("definestmt", &["simpleassignstmt"]),
            ("addassignstmt", &["compoundassignstmt"]),
            ("subassignstmt", &["compoundassignstmt"]),
            ("mulassignstmt", &["compoundassignstmt"]),
            ("quoassignstmt", &["compoundassignstmt"]),
            ("remassignstmt", &["compoundassignstmt"]),
            ("andassignstmt", &["compoundassignstmt"]),
            ("orassignstmt", &["compoundassignstmt"]),
            ("xorassignstmt", &["compoundassignstmt"]),
            ("shlassignstmt", &["compoundassignstmt"]),
            ("shrassignstmt", &["compoundassignstmt"]),
            ("andnotassignstmt", &["compoundassignstmt"]),
        ],
    )?;

    // ========== Declarations and specs ==========

    let decl = b.declare_case("decl", "kind")?;
    branches(b, decl, &[("baddecl", &[])])?;
    b.declare_union("gendecl", &["documentable"])?;
    branches(
        b,
        decl,
        &[
            ("importdecl", &["gendecl"]),
            ("constdecl", &["gendecl"]),
            ("typedecl", &["gendecl"]),
            ("vardecl", &["gendecl"]),
            ("funcdecl", &["documentable", "funcdef"]),
        ],
    )?;

    let spec = b.declare_case("spec", "kind")?;
    branches(b, spec, &[("importspec", &[]), ("valuespec", &[]), ("typespec", &[])])?;

    // ========== Objects ==========

    b.declare_primary_key("object", &[])?;
    let object = b.declare_case("object", "kind")?;
    b.declare_union("declobject", &[])?;
    b.declare_union("builtinobject", &[])?;
    branches(b, object, &[("pkgobject", &[])])?;
    b.declare_union("typeobject", &[])?;
    branches(
        b,
        object,
        &[
            ("decltypeobject", &["typeobject", "declobject"]),
            ("builtintypeobject", &["typeobject", "builtinobject"]),
        ],
    )?;
    b.declare_union("valueobject", &[])?;
    b.declare_union("constobject", &["valueobject"])?;
    branches(
        b,
        object,
        &[
            ("declconstobject", &["constobject", "declobject"]),
            ("builtinconstobject", &["constobject", "builtinobject"]),
        ],
    )?;
    b.declare_union("varobject", &["valueobject"])?;
    branches(b, object, &[("declvarobject", &["varobject", "declobject"])])?;
    b.declare_union("functionobject", &["valueobject"])?;
    branches(
        b,
        object,
        &[
            ("declfunctionobject", &["functionobject", "declobject"]),
            ("builtinfunctionobject", &["functionobject", "builtinobject"]),
            ("labelobject", &[]),
        ],
    )?;

    // ========== Scopes ==========

    b.declare_primary_key("scope", &[])?;
    let scope = b.declare_case("scope", "kind")?;
    branches(
        b,
        scope,
        &[
            ("universescope", &[]),
            ("packagescope", &[]),
            ("localscope", &["locatable"]),
        ],
    )?;

    // ========== Types ==========

    let ty = b.declare_case("type", "kind")?;
    b.declare_union("basictype", &[])?;
    b.declare_union("booltype", &["basictype"])?;
    b.declare_union("numerictype", &["basictype"])?;
    b.declare_union("integertype", &["numerictype"])?;
    b.declare_union("signedintegertype", &["integertype"])?;
    b.declare_union("unsignedintegertype", &["integertype"])?;
    b.declare_union("floattype", &["numerictype"])?;
    b.declare_union("complextype", &["numerictype"])?;
    b.declare_union("stringtype", &["basictype"])?;
    b.declare_union("literaltype", &["basictype"])?;

    // Basic types, in basic-kind order
    branches(
        b,
        ty,
        &[
            ("invalidtype", &["basictype"]),
            ("boolexprtype", &["booltype"]),
            ("inttype", &["signedintegertype"]),
            ("int8type", &["signedintegertype"]),
            ("int16type", &["signedintegertype"]),
            ("int32type", &["signedintegertype"]),
            ("int64type", &["signedintegertype"]),
            ("uinttype", &["unsignedintegertype"]),
            ("uint8type", &["unsignedintegertype"]),
            ("uint16type", &["unsignedintegertype"]),
            ("uint32type", &["unsignedintegertype"]),
            ("uint64type", &["unsignedintegertype"]),
            ("uintptrtype", &["basictype"]),
            ("float32type", &["floattype"]),
            ("float64type", &["floattype"]),
            ("complex64type", &["complextype"]),
            ("complex128type", &["complextype"]),
            ("stringexprtype", &["stringtype"]),
            ("unsafepointertype", &["basictype"]),
            ("boolliteraltype", &["literaltype", "booltype"]),
            ("intliteraltype", &["literaltype", "signedintegertype"]),
            ("runeliteraltype", &["literaltype", "signedintegertype"]),
            ("floatliteraltype", &["literaltype", "floattype"]),
            ("complexliteraltype", &["literaltype", "complextype"]),
            ("stringliteraltype", &["literaltype", "stringtype"]),
            ("nilliteraltype", &["literaltype"]),
        ],
    )?;

    b.declare_union("compositetype", &[])?;
    b.declare_union("containertype", &["compositetype"])?;
    branches(
        b,
        ty,
        &[
            ("arraytype", &["containertype"]),
            ("slicetype", &["containertype"]),
            ("structtype", &["compositetype"]),
            ("pointertype", &["compositetype"]),
            ("interfacetype", &["compositetype"]),
            ("tupletype", &["compositetype"]),
            ("signaturetype", &["compositetype"]),
            ("maptype", &["containertype"]),
        ],
    )?;

    b.declare_union("chantype", &["containertype"])?;
    branches(
        b,
        ty,
        &[
            ("sendchantype", &["chantype"]),
            ("recvchantype", &["chantype"]),
            ("sendrcvchantype", &["chantype"]),
            ("namedtype", &["compositetype"]),
        ],
    )?;

    // ========== Packages ==========

    b.declare_primary_key("package", &[])?;

    Ok(())
}
