//! Storage provider: the pipeline artifact bucket.

use groundwork_core::storage::{Bucket, RemovalPolicy};
use groundwork_core::{Composition, LogicalId, ResourceRef, Result};

#[derive(Debug, Clone)]
pub struct StorageOutputs {
    pub bucket: ResourceRef<Bucket>,
}

/// Create the artifact bucket. Artifacts do not need to survive stack
/// deletion, so the bucket is torn down on destroy.
pub fn create_storage(comp: &mut Composition, scope: &str) -> Result<StorageOutputs> {
    let bucket = comp.add(
        LogicalId::new(scope, "artifacts"),
        Bucket {
            removal_policy: RemovalPolicy::Destroy,
        },
    )?;
    Ok(StorageOutputs { bucket })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::ResourceProps;

    #[test]
    fn bucket_is_destroyed_with_the_stack() {
        let mut comp = Composition::new();
        let outputs = create_storage(&mut comp, "shop").unwrap();
        let ResourceProps::Bucket(bucket) = &comp.get(outputs.bucket.id()).unwrap().props else {
            panic!("expected bucket");
        };
        assert_eq!(bucket.removal_policy, RemovalPolicy::Destroy);
    }
}
