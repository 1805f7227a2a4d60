//! Entity Id Allocation
//!
//! The only schema-adjacent state that changes after close. One atomic
//! counter per id domain; callers on any number of threads draw fresh ids
//! without locking. Ids start at 1 and must fit the `int` column range.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::AllocError;
use crate::lattice::TypeId;
use crate::schema::Schema;

/// Largest id an `int` column can hold
pub const MAX_ID: u64 = i32::MAX as u64;

/// A concrete entity: its declared type and its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub ty: TypeId,
    pub id: u64,
}

/// Lock-free id source for a closed schema
#[derive(Debug)]
pub struct IdAllocator<'s> {
    schema: &'s Schema,
    /// Next id to hand out, per domain
    next: Vec<AtomicU64>,
}

impl<'s> IdAllocator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        let next = (0..schema.domain_count()).map(|_| AtomicU64::new(1)).collect();
        Self { schema, next }
    }

    /// Allocate one fresh id for an instance of `ty`
    pub fn allocate(&self, ty: TypeId) -> Result<Entity, AllocError> {
        let ids = self.reserve(ty, 1)?;
        Ok(Entity { ty, id: ids.start })
    }

    /// Allocate by type name
    pub fn allocate_named(&self, name: &str) -> Result<Entity, AllocError> {
        let ty = self
            .schema
            .type_id(name)
            .ok_or_else(|| AllocError::UnknownType(name.to_string()))?;
        self.allocate(ty)
    }

    /// Reserve a contiguous block of `count` ids, e.g. for one worker.
    ///
    /// A block that does not fit in the remaining range fails without
    /// consuming any id. The counter never moves past `MAX_ID + 1`, so once a
    /// domain is used up every later call for it fails.
    pub fn reserve(&self, ty: TypeId, count: u64) -> Result<Range<u64>, AllocError> {
        let domain = self.domain(ty)?;
        if count > MAX_ID {
            return Err(AllocError::Exhausted(self.domain_label(domain)));
        }
        let start = self.next[domain]
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(count).filter(|&end| end - 1 <= MAX_ID)
            })
            .map_err(|_| AllocError::Exhausted(self.domain_label(domain)))?;
        Ok(start..start + count)
    }

    /// Ids handed out so far in the domain of `ty`
    pub fn allocated(&self, ty: TypeId) -> Result<u64, AllocError> {
        let domain = self.domain(ty)?;
        Ok((self.next[domain].load(Ordering::Relaxed) - 1).min(MAX_ID))
    }

    fn domain(&self, ty: TypeId) -> Result<usize, AllocError> {
        let entity = self
            .schema
            .types()
            .get(ty.index())
            .ok_or_else(|| AllocError::UnknownType(format!("#{}", ty.index())))?;
        self.schema
            .domain_of(ty)
            .ok_or_else(|| AllocError::NotConcrete(entity.name.clone()))
    }

    fn domain_label(&self, domain: usize) -> String {
        self.schema.domain_name(domain).unwrap_or("?").to_string()
    }

    #[cfg(test)]
    fn seek(&self, ty: TypeId, next: u64) {
        if let Ok(domain) = self.domain(ty) {
            self.next[domain].store(next, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema() -> Schema {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("node", &[]).unwrap();
        builder.declare_primary_key("file", &["node"]).unwrap();
        builder.declare_primary_key("expr", &["node"]).unwrap();
        let kind = builder.declare_case("expr", "kind").unwrap();
        builder.new_branch(kind, "ident", &[]).unwrap();
        builder.declare_alias("sourcefile", "file").unwrap();
        builder.close().unwrap()
    }

    #[test]
    fn test_ids_ascend_per_domain() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);
        let file = schema.type_id("file").unwrap();
        let expr = schema.type_id("expr").unwrap();

        assert_eq!(alloc.allocate(file).unwrap().id, 1);
        assert_eq!(alloc.allocate(file).unwrap().id, 2);
        assert_eq!(alloc.allocate(expr).unwrap().id, 1);
        assert_eq!(alloc.allocate_named("sourcefile").unwrap().id, 3);
    }

    #[test]
    fn test_branch_shares_case_base_domain() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);

        let expr = alloc.allocate_named("expr").unwrap();
        let ident = alloc.allocate_named("ident").unwrap();
        assert_eq!((expr.id, ident.id), (1, 2));
        assert_eq!(ident.ty, schema.type_id("ident").unwrap());
    }

    #[test]
    fn test_reserve_block() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);
        let file = schema.type_id("file").unwrap();

        assert_eq!(alloc.reserve(file, 100).unwrap(), 1..101);
        assert_eq!(alloc.allocate(file).unwrap().id, 101);
        assert_eq!(alloc.allocated(file).unwrap(), 101);
    }

    #[test]
    fn test_union_and_unknown_types_fail() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);

        assert_eq!(
            alloc.allocate_named("node"),
            Err(AllocError::NotConcrete("node".to_string()))
        );
        assert_eq!(
            alloc.allocate_named("missing"),
            Err(AllocError::UnknownType("missing".to_string()))
        );
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);
        let file = schema.type_id("file").unwrap();

        alloc.seek(file, MAX_ID);
        assert_eq!(alloc.allocate(file).unwrap().id, MAX_ID);
        assert_eq!(alloc.allocate(file), Err(AllocError::Exhausted("file".to_string())));
        assert!(alloc.allocate(file).is_err());
        assert!(alloc.allocate_named("expr").is_ok());
    }

    #[test]
    fn test_oversized_reserve_consumes_nothing() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);
        let file = schema.type_id("file").unwrap();

        assert_eq!(alloc.allocate(file).unwrap().id, 1);
        assert_eq!(alloc.reserve(file, u64::MAX), Err(AllocError::Exhausted("file".to_string())));
        assert_eq!(alloc.reserve(file, MAX_ID), Err(AllocError::Exhausted("file".to_string())));
        assert_eq!(alloc.allocate(file).unwrap().id, 2);
        assert_eq!(alloc.allocated(file).unwrap(), 2);
    }

    #[test]
    fn test_reserve_up_to_the_last_id() {
        let schema = schema();
        let alloc = IdAllocator::new(&schema);
        let file = schema.type_id("file").unwrap();

        alloc.seek(file, MAX_ID - 1);
        assert!(alloc.reserve(file, 3).is_err());
        assert_eq!(alloc.reserve(file, 2).unwrap(), MAX_ID - 1..MAX_ID + 1);
        assert!(alloc.allocate(file).is_err());
        assert!(alloc.reserve(file, u64::MAX).is_err());
        assert_eq!(alloc.allocated(file).unwrap(), MAX_ID);
    }
}
