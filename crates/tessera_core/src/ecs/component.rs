//! # Component Kinds
//!
//! A component kind is a plain-data type bound to one bit of the
//! [`ComponentMask`]. Stores keep one dense array per kind, so values must
//! be fixed-size and trivially copyable.

use bytemuck::{Pod, Zeroable};

use super::mask::ComponentMask;
use super::storage::ComponentRegistry;
use crate::error::{EcsError, EcsResult};

/// A kind of data that can be attached to entities.
///
/// The `Pod + Zeroable + Default` bound lets a store fill a whole array up
/// front and overwrite entries in place without ever dropping anything.
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Armor {
///     rating: f32,
///     durability: u32,
/// }
///
/// impl Component for Armor {
///     const ID: u8 = 7;
/// }
/// ```
pub trait Component: Copy + Pod + Zeroable + Default + Send + Sync + 'static {
    /// Bit position of this component kind (0-63).
    ///
    /// Must be unique among the kinds registered with one store.
    const ID: u8;

    /// Single-bit mask for this kind. An `ID` of 64 or more fails to compile
    /// wherever the mask is used.
    const MASK: ComponentMask = ComponentMask::from_id(Self::ID);
}

/// A group of components attached together by
/// [`Store::create_entity`](crate::Store::create_entity).
///
/// Implemented for `()` and for tuples of up to eight components.
pub trait ComponentSet: Send {
    /// Union of the kinds in this set.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if a kind occurs twice.
    fn mask() -> EcsResult<ComponentMask>;

    /// Checks every kind owns a bucket in `registry`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] for the first kind without one.
    fn ensure(registry: &ComponentRegistry) -> EcsResult<()>;

    /// Writes every component into its bucket at `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if a kind has no bucket.
    fn write(self, registry: &ComponentRegistry, index: usize) -> EcsResult<()>;
}

impl ComponentSet for () {
    fn mask() -> EcsResult<ComponentMask> {
        Ok(ComponentMask::EMPTY)
    }

    fn ensure(_registry: &ComponentRegistry) -> EcsResult<()> {
        Ok(())
    }

    fn write(self, _registry: &ComponentRegistry, _index: usize) -> EcsResult<()> {
        Ok(())
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn mask() -> EcsResult<ComponentMask> {
                let mut mask = ComponentMask::EMPTY;
                $(
                    if mask.intersects($name::MASK) {
                        return Err(EcsError::DuplicateComponent { id: $name::ID });
                    }
                    mask |= $name::MASK;
                )+
                Ok(mask)
            }

            fn ensure(registry: &ComponentRegistry) -> EcsResult<()> {
                $(registry.ensure::<$name>()?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn write(self, registry: &ComponentRegistry, index: usize) -> EcsResult<()> {
                let ($($name,)+) = self;
                $(registry.store(index, $name)?;)+
                Ok(())
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Mass(f32);

    impl Component for Mass {
        const ID: u8 = 3;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct Team(u32);

    impl Component for Team {
        const ID: u8 = 40;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct OtherTeam(u32);

    impl Component for OtherTeam {
        const ID: u8 = 40;
    }

    #[test]
    fn test_component_mask_constant() {
        assert_eq!(Mass::MASK.bits(), 1 << 3);
        assert_eq!(Team::MASK.bits(), 1 << 40);
        assert_eq!(Team::MASK, OtherTeam::MASK);
    }

    #[test]
    fn test_components_are_plain_data() {
        let bytes = bytemuck::bytes_of(&Team(7));
        assert_eq!(bytes.len(), 4);
        assert_eq!(OtherTeam(3).0 + Team::default().0, 3);
        assert!(Mass(2.5).0 > Mass::default().0);
    }

    #[test]
    fn test_set_mask_is_union() {
        let mask = <(Mass, Team)>::mask().unwrap();
        assert_eq!(mask, Mass::MASK | Team::MASK);
        assert_eq!(<()>::mask().unwrap(), ComponentMask::EMPTY);
    }

    #[test]
    fn test_set_mask_rejects_duplicates() {
        let err = <(Mass, Team, Mass)>::mask().unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { id: 3 }));

        let err = <(Team, OtherTeam)>::mask().unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { id: 40 }));
    }
}
