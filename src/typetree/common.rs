/// Unity's shared string table. Type tree nodes reference it with the high
/// bit of a string offset set.
pub const COMMON_STRINGS: &str = concat!(
    "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0BitField\0bitset\0bool\0char\0",
    "ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0FastPropertyName\0first\0float\0Font\0",
    "GameObject\0Generic Mono\0GradientNEW\0GUID\0GUIStyle\0int\0list\0long long\0map\0Matrix4x4f\0",
    "MdFour\0MonoBehaviour\0MonoScript\0m_ByteSize\0m_Curve\0m_EditorClassIdentifier\0",
    "m_EditorHideFlags\0m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0m_IsArray\0m_IsStatic\0",
    "m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0m_PrefabParentObject\0m_Script\0",
    "m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0PPtr<Component>\0PPtr<GameObject>\0",
    "PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0PPtr<Object>\0PPtr<Prefab>\0",
    "PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0PPtr<Texture2D>\0PPtr<Transform>\0Prefab\0",
    "Quaternionf\0Rectf\0RectInt\0RectOffset\0second\0set\0short\0size\0SInt16\0SInt32\0SInt64\0",
    "SInt8\0staticvector\0string\0TextAsset\0TextMesh\0Texture\0Texture2D\0Transform\0TypelessData\0",
    "UInt16\0UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0unsigned short\0vector\0",
    "Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0Type*\0int2_storage\0",
    "int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0m_PrefabInstance\0m_PrefabAsset\0",
    "FileSize\0Hash128\0RenderingLayerMask\0",
);

pub fn common_string(offset: u32) -> Option<&'static str> {
    let offset = offset as usize;
    if offset > 0 && COMMON_STRINGS.as_bytes().get(offset - 1) != Some(&0) {
        return None;
    }
    COMMON_STRINGS.get(offset..)?.split('\0').next().filter(|s| !s.is_empty())
}

pub fn common_offset(value: &str) -> Option<u32> {
    let mut offset = 0;
    for s in COMMON_STRINGS.split('\0') {
        if s == value && !s.is_empty() {
            return Some(offset as u32);
        }
        offset += s.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_offsets() {
        assert_eq!(common_string(0), Some("AABB"));
        assert_eq!(common_string(222), Some("int"));
        assert_eq!(common_string(427), Some("m_Name"));
        assert_eq!(common_offset("Array"), Some(49));
        assert_eq!(common_string(1), None);
    }
}
